//! Loading `sync-repo-settings.yaml`
//!
//! Loading happens in three stages, each with its own failure mode:
//!
//! 1. YAML syntax ([`ConfigError::Syntax`])
//! 2. Document shape: unknown keys, wrong types ([`ConfigError::Schema`])
//! 3. Semantic validation: duplicate keys, bad colors, ranges ([`ConfigError::Schema`])
//!
//! An empty document is treated the same as a missing file: there is nothing
//! to manage.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::config::{GeneralSettings, RepoConfig};
use crate::error::{ConfigError, Error, Result};
use crate::label::{DEFAULT_LABEL_DENY_LIST, Label, LabelDeletion, LabelPolicy, normalize_color};
use crate::permission::{CollaboratorEntry, Permission, Principal};
use crate::protection::BranchProtectionRule;

/// File name of the desired-state document.
pub const CONFIG_FILE_NAME: &str = "sync-repo-settings.yaml";

/// Location of the desired-state document inside a repository.
pub const DEFAULT_CONFIG_PATH: &str = ".github/sync-repo-settings.yaml";

const MAX_TOPICS: usize = 20;
const MAX_REVIEW_COUNT: u8 = 6;
const MAX_LABEL_NAME_LEN: usize = 50;
const MAX_LABEL_DESCRIPTION_LEN: usize = 100;

static TOPIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,49}$").unwrap());

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RepoConfigDocument {
    description: Option<String>,
    homepage: Option<String>,
    has_issues: Option<bool>,
    has_wiki: Option<bool>,
    has_projects: Option<bool>,
    squash_merge_allowed: Option<bool>,
    merge_commit_allowed: Option<bool>,
    rebase_merge_allowed: Option<bool>,
    auto_merge_allowed: Option<bool>,
    delete_branch_on_merge: Option<bool>,
    default_branch: Option<String>,
    topics: Option<Vec<String>>,
    branch_protection_rules: Option<Vec<BranchProtectionRule>>,
    labels: Option<Vec<LabelDocument>>,
    label_policy: Option<LabelDeletion>,
    label_deny_list: Option<Vec<String>>,
    permission_rules: Option<Vec<PermissionRuleDocument>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LabelDocument {
    name: String,
    color: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PermissionRuleDocument {
    #[serde(alias = "login")]
    user: Option<String>,
    team: Option<String>,
    permission: Permission,
}

/// Parse and validate a desired-state document.
///
/// `source_name` identifies the document in error messages (a path or
/// `owner/repo:.github/sync-repo-settings.yaml`).
///
/// Returns `Ok(None)` for an empty document.
pub fn parse_config(source_name: &str, text: &str) -> std::result::Result<Option<RepoConfig>, ConfigError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| ConfigError::Syntax {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;

    if value.is_null() {
        return Ok(None);
    }

    let document: RepoConfigDocument =
        serde_yaml::from_value(value).map_err(|e| ConfigError::Schema {
            source_name: source_name.to_string(),
            issues: vec![e.to_string()],
        })?;

    let mut issues = Vec::new();
    let config = document.into_config(&mut issues);
    if !issues.is_empty() {
        return Err(ConfigError::Schema {
            source_name: source_name.to_string(),
            issues,
        });
    }

    tracing::debug!(
        source = source_name,
        categories = ?config.managed_categories(),
        "Loaded repository settings"
    );
    Ok(Some(config))
}

/// Load a desired-state document from a local file.
///
/// A missing file is not an error: it yields `Ok(None)`.
pub fn load_config_file(path: &Path) -> Result<Option<RepoConfig>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    Ok(parse_config(&path.display().to_string(), &text)?)
}

impl RepoConfigDocument {
    fn into_config(self, issues: &mut Vec<String>) -> RepoConfig {
        if let Some(branch) = &self.default_branch {
            validate_branch_name("defaultBranch", branch, issues);
        }

        let settings = GeneralSettings {
            description: self.description,
            homepage: self.homepage,
            has_issues: self.has_issues,
            has_wiki: self.has_wiki,
            has_projects: self.has_projects,
            allow_squash_merge: self.squash_merge_allowed,
            allow_merge_commit: self.merge_commit_allowed,
            allow_rebase_merge: self.rebase_merge_allowed,
            allow_auto_merge: self.auto_merge_allowed,
            delete_branch_on_merge: self.delete_branch_on_merge,
            default_branch: self.default_branch,
        };

        if settings.allow_squash_merge == Some(false)
            && settings.allow_merge_commit == Some(false)
            && settings.allow_rebase_merge == Some(false)
        {
            issues.push("at least one merge method must be allowed".to_string());
        }

        let label_policy = match self.label_deny_list {
            Some(list) => LabelPolicy::new(self.label_policy.unwrap_or_default(), list),
            None => LabelPolicy::new(self.label_policy.unwrap_or_default(), DEFAULT_LABEL_DENY_LIST),
        };

        RepoConfig {
            settings,
            topics: self.topics.map(|topics| normalize_topics(topics, issues)),
            branch_protection_rules: self
                .branch_protection_rules
                .map(|rules| validate_protection_rules(rules, issues)),
            labels: self.labels.map(|labels| validate_labels(labels, issues)),
            label_policy,
            collaborators: self
                .permission_rules
                .map(|rules| validate_permission_rules(rules, issues)),
        }
    }
}

fn validate_branch_name(field: &str, branch: &str, issues: &mut Vec<String>) {
    if branch.trim().is_empty() {
        issues.push(format!("{field}: branch name must not be empty"));
    } else if branch.contains(char::is_whitespace)
        || branch.contains("..")
        || branch.starts_with('/')
        || branch.ends_with('/')
    {
        issues.push(format!("{field}: '{branch}' is not a valid branch name"));
    }
}

fn normalize_topics(topics: Vec<String>, issues: &mut Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = topics
        .into_iter()
        .map(|topic| topic.trim().to_lowercase())
        .collect();
    normalized.sort();
    normalized.dedup();

    for topic in &normalized {
        if !TOPIC.is_match(topic) {
            issues.push(format!(
                "topics: '{topic}' must be lowercase letters, numbers and hyphens (max 50 characters)"
            ));
        }
    }
    if normalized.len() > MAX_TOPICS {
        issues.push(format!(
            "topics: at most {MAX_TOPICS} topics are allowed, found {}",
            normalized.len()
        ));
    }
    normalized
}

fn validate_protection_rules(
    rules: Vec<BranchProtectionRule>,
    issues: &mut Vec<String>,
) -> Vec<BranchProtectionRule> {
    let mut seen = HashSet::new();
    rules
        .into_iter()
        .map(BranchProtectionRule::normalized)
        .inspect(|rule| {
            let field = format!("branchProtectionRules[{}]", rule.pattern);
            validate_branch_name(&field, &rule.pattern, issues);
            if rule.pattern.contains(['*', '?', '[']) {
                issues.push(format!(
                    "{field}: wildcard patterns are not supported, name the branch exactly"
                ));
            }
            if rule.required_approving_review_count > MAX_REVIEW_COUNT {
                issues.push(format!(
                    "{field}: requiredApprovingReviewCount must be between 0 and {MAX_REVIEW_COUNT}"
                ));
            }
            if !seen.insert(rule.pattern.clone()) {
                issues.push(format!("{field}: duplicate pattern"));
            }
        })
        .collect()
}

fn validate_labels(labels: Vec<LabelDocument>, issues: &mut Vec<String>) -> Vec<Label> {
    let mut seen = HashSet::new();
    let mut validated = Vec::with_capacity(labels.len());

    for doc in labels {
        let name = doc.name.trim().to_string();
        if name.is_empty() {
            issues.push("labels: label name must not be empty".to_string());
            continue;
        }
        if name.chars().count() > MAX_LABEL_NAME_LEN {
            issues.push(format!(
                "labels[{name}]: name is longer than {MAX_LABEL_NAME_LEN} characters"
            ));
        }
        if doc
            .description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_LABEL_DESCRIPTION_LEN)
        {
            issues.push(format!(
                "labels[{name}]: description is longer than {MAX_LABEL_DESCRIPTION_LEN} characters"
            ));
        }
        if !seen.insert(name.to_lowercase()) {
            issues.push(format!("labels[{name}]: duplicate label name"));
        }
        match normalize_color(&doc.color) {
            Ok(color) => validated.push(Label {
                name,
                color,
                description: doc.description,
            }),
            Err(e) => issues.push(format!("labels[{name}]: {e}")),
        }
    }
    validated
}

fn validate_permission_rules(
    rules: Vec<PermissionRuleDocument>,
    issues: &mut Vec<String>,
) -> Vec<CollaboratorEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(rules.len());

    for (index, rule) in rules.into_iter().enumerate() {
        let principal = match (rule.user, rule.team) {
            (Some(user), None) if !user.trim().is_empty() => Principal::user(user),
            (None, Some(team)) if !team.trim().is_empty() => Principal::team(team),
            (Some(_), Some(_)) => {
                issues.push(format!(
                    "permissionRules[{index}]: set either 'user' or 'team', not both"
                ));
                continue;
            }
            _ => {
                issues.push(format!(
                    "permissionRules[{index}]: a non-empty 'user' or 'team' is required"
                ));
                continue;
            }
        };
        if !seen.insert(principal.clone()) {
            issues.push(format!("permissionRules[{index}]: duplicate entry for {principal}"));
            continue;
        }
        entries.push(CollaboratorEntry {
            principal,
            permission: rule.permission,
        });
    }
    entries
}
