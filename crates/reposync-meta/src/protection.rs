//! Branch protection rules

use serde::{Deserialize, Serialize};

/// Desired protection for one branch.
///
/// Rules are keyed by `pattern`, which names a branch exactly. Status check
/// contexts have set semantics; [`BranchProtectionRule::normalized`] sorts and
/// deduplicates them so rules can be compared with `==`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BranchProtectionRule {
    pub pattern: String,
    #[serde(default, rename = "requiredStatusCheckContexts")]
    pub status_check_contexts: Vec<String>,
    #[serde(default, rename = "requiresStrictStatusChecks")]
    pub strict_status_checks: bool,
    #[serde(default)]
    pub required_approving_review_count: u8,
    #[serde(default)]
    pub requires_code_owner_reviews: bool,
    #[serde(default)]
    pub dismisses_stale_reviews: bool,
    #[serde(default)]
    pub is_admin_enforced: bool,
    #[serde(default)]
    pub requires_linear_history: bool,
    #[serde(default)]
    pub allows_force_pushes: bool,
    #[serde(default)]
    pub allows_deletions: bool,
}

impl BranchProtectionRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Sort and deduplicate status check contexts.
    pub fn normalized(mut self) -> Self {
        self.status_check_contexts = self
            .status_check_contexts
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        self.status_check_contexts.sort();
        self.status_check_contexts.dedup();
        self
    }

    /// Whether any pull request review requirement is set.
    pub fn requires_reviews(&self) -> bool {
        self.required_approving_review_count > 0
            || self.requires_code_owner_reviews
            || self.dismisses_stale_reviews
    }

    /// Whether any status check requirement is set.
    pub fn requires_status_checks(&self) -> bool {
        !self.status_check_contexts.is_empty() || self.strict_status_checks
    }

    /// Names of the settings that differ from `other`, ignoring the pattern.
    pub fn differences(&self, other: &BranchProtectionRule) -> Vec<&'static str> {
        let a = self.clone().normalized();
        let b = other.clone().normalized();
        let mut fields = Vec::new();
        if a.status_check_contexts != b.status_check_contexts {
            fields.push("requiredStatusCheckContexts");
        }
        if a.strict_status_checks != b.strict_status_checks {
            fields.push("requiresStrictStatusChecks");
        }
        if a.required_approving_review_count != b.required_approving_review_count {
            fields.push("requiredApprovingReviewCount");
        }
        if a.requires_code_owner_reviews != b.requires_code_owner_reviews {
            fields.push("requiresCodeOwnerReviews");
        }
        if a.dismisses_stale_reviews != b.dismisses_stale_reviews {
            fields.push("dismissesStaleReviews");
        }
        if a.is_admin_enforced != b.is_admin_enforced {
            fields.push("isAdminEnforced");
        }
        if a.requires_linear_history != b.requires_linear_history {
            fields.push("requiresLinearHistory");
        }
        if a.allows_force_pushes != b.allows_force_pushes {
            fields.push("allowsForcePushes");
        }
        if a.allows_deletions != b.allows_deletions {
            fields.push("allowsDeletions");
        }
        fields
    }
}
