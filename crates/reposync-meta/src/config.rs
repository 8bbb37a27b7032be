//! The desired repository state
//!
//! [`RepoConfig`] is the validated form of `sync-repo-settings.yaml`. Every
//! category is optional: a field left as `None` means "do not manage this",
//! never "clear it".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::label::{Label, LabelPolicy};
use crate::permission::CollaboratorEntry;
use crate::protection::BranchProtectionRule;

/// Scalar repository settings.
///
/// Used both as desired state (unset fields are unmanaged) and as the
/// current state read from the API. Field names follow the REST API so a
/// patch serializes directly into an update request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_issues: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_wiki: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_projects: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_squash_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_merge_commit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_rebase_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_auto_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_branch_on_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

fn changed<T: PartialEq + Clone>(desired: &Option<T>, current: &Option<T>) -> Option<T> {
    match desired {
        Some(value) if current.as_ref() != Some(value) => Some(value.clone()),
        _ => None,
    }
}

impl GeneralSettings {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// A patch holding only the fields set here that differ from `current`.
    pub fn changes_from(&self, current: &GeneralSettings) -> GeneralSettings {
        GeneralSettings {
            description: changed(&self.description, &current.description),
            homepage: changed(&self.homepage, &current.homepage),
            has_issues: changed(&self.has_issues, &current.has_issues),
            has_wiki: changed(&self.has_wiki, &current.has_wiki),
            has_projects: changed(&self.has_projects, &current.has_projects),
            allow_squash_merge: changed(&self.allow_squash_merge, &current.allow_squash_merge),
            allow_merge_commit: changed(&self.allow_merge_commit, &current.allow_merge_commit),
            allow_rebase_merge: changed(&self.allow_rebase_merge, &current.allow_rebase_merge),
            allow_auto_merge: changed(&self.allow_auto_merge, &current.allow_auto_merge),
            delete_branch_on_merge: changed(
                &self.delete_branch_on_merge,
                &current.delete_branch_on_merge,
            ),
            default_branch: changed(&self.default_branch, &current.default_branch),
        }
    }

    /// Project `current` onto the fields set here, so that logging a patch
    /// shows only the previous values of the fields being changed.
    pub fn previous_values(&self, current: &GeneralSettings) -> GeneralSettings {
        fn pick<T: Clone>(mask: &Option<T>, current: &Option<T>) -> Option<T> {
            mask.as_ref().and(current.clone())
        }
        GeneralSettings {
            description: pick(&self.description, &current.description),
            homepage: pick(&self.homepage, &current.homepage),
            has_issues: pick(&self.has_issues, &current.has_issues),
            has_wiki: pick(&self.has_wiki, &current.has_wiki),
            has_projects: pick(&self.has_projects, &current.has_projects),
            allow_squash_merge: pick(&self.allow_squash_merge, &current.allow_squash_merge),
            allow_merge_commit: pick(&self.allow_merge_commit, &current.allow_merge_commit),
            allow_rebase_merge: pick(&self.allow_rebase_merge, &current.allow_rebase_merge),
            allow_auto_merge: pick(&self.allow_auto_merge, &current.allow_auto_merge),
            delete_branch_on_merge: pick(
                &self.delete_branch_on_merge,
                &current.delete_branch_on_merge,
            ),
            default_branch: pick(&self.default_branch, &current.default_branch),
        }
    }

    /// Names of the fields that are set, in declaration order.
    pub fn field_names(&self) -> Vec<&'static str> {
        let flags = [
            ("description", self.description.is_some()),
            ("homepage", self.homepage.is_some()),
            ("has_issues", self.has_issues.is_some()),
            ("has_wiki", self.has_wiki.is_some()),
            ("has_projects", self.has_projects.is_some()),
            ("allow_squash_merge", self.allow_squash_merge.is_some()),
            ("allow_merge_commit", self.allow_merge_commit.is_some()),
            ("allow_rebase_merge", self.allow_rebase_merge.is_some()),
            ("allow_auto_merge", self.allow_auto_merge.is_some()),
            ("delete_branch_on_merge", self.delete_branch_on_merge.is_some()),
            ("default_branch", self.default_branch.is_some()),
        ];
        flags
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }
}

/// Validated desired state for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoConfig {
    pub settings: GeneralSettings,
    /// Normalized: lowercase, sorted, deduplicated.
    pub topics: Option<Vec<String>>,
    pub branch_protection_rules: Option<Vec<BranchProtectionRule>>,
    pub labels: Option<Vec<Label>>,
    pub label_policy: LabelPolicy,
    pub collaborators: Option<Vec<CollaboratorEntry>>,
}

impl RepoConfig {
    /// Categories this configuration addresses.
    pub fn managed_categories(&self) -> BTreeSet<Category> {
        let mut categories = BTreeSet::new();
        if !self.settings.is_empty() || self.topics.is_some() {
            categories.insert(Category::GeneralSettings);
        }
        if self.branch_protection_rules.is_some() {
            categories.insert(Category::BranchProtection);
        }
        if self.labels.is_some() {
            categories.insert(Category::Labels);
        }
        if self.collaborators.is_some() {
            categories.insert(Category::Collaborators);
        }
        categories
    }

    pub fn manages(&self, category: Category) -> bool {
        self.managed_categories().contains(&category)
    }
}
