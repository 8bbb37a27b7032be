//! The diff between current and desired state
//!
//! [`reconcile`] is pure: the same snapshot and config always produce the
//! same [`ChangePlan`], whatever order the inputs list their items in.
//! Deletion is deliberately narrow. Protection rules and collaborators are
//! never removed, and labels only as the config's [`LabelPolicy`] allows.
//!
//! [`LabelPolicy`]: reposync_meta::LabelPolicy

use std::collections::BTreeMap;

use reposync_meta::{Category, GeneralSettings, Label, Permission, RepoConfig};

use super::plan::{Change, ChangeAction, ChangeOperation, ChangePlan, SkippedItem};
use super::snapshot::CurrentState;

/// Compute the operations that move `current` to `desired`.
pub fn reconcile(current: &CurrentState, desired: &RepoConfig) -> ChangePlan {
    let mut plan = ChangePlan::default();
    let mut operations = Vec::new();

    for category in Category::ALL {
        let mut ops = match category {
            Category::GeneralSettings => general_settings(current, desired, &mut plan.skipped),
            Category::BranchProtection => branch_protection(current, desired, &mut plan.skipped),
            Category::Labels => labels(current, desired),
            Category::Collaborators => collaborators(current, desired),
        };
        ops.sort_by(|a, b| a.key.cmp(&b.key));
        operations.extend(ops);
    }

    plan.operations = operations;
    plan.skipped
        .sort_by(|a, b| (a.category, &a.key).cmp(&(b.category, &b.key)));
    plan
}

fn skip(skipped: &mut Vec<SkippedItem>, category: Category, key: &str, reason: String) {
    skipped.push(SkippedItem {
        category,
        key: key.to_string(),
        reason,
    });
}

fn general_settings(
    current: &CurrentState,
    desired: &RepoConfig,
    skipped: &mut Vec<SkippedItem>,
) -> Vec<ChangeOperation> {
    let mut ops = Vec::new();
    let live = &current.repository.settings;

    let mut wanted: GeneralSettings = desired.settings.clone();
    if let Some(branch) = &wanted.default_branch {
        let is_current = live.default_branch.as_ref() == Some(branch);
        if !is_current && current.branch_exists(branch) == Some(false) {
            skip(
                skipped,
                Category::GeneralSettings,
                "default_branch",
                format!("branch '{branch}' does not exist"),
            );
            wanted.default_branch = None;
        }
    }

    let patch = wanted.changes_from(live);
    if !patch.is_empty() {
        let previous = patch.previous_values(live);
        ops.push(ChangeOperation {
            category: Category::GeneralSettings,
            action: ChangeAction::Update,
            key: "settings".to_string(),
            change: Change::Settings { patch, previous },
        });
    }

    if let Some(topics) = &desired.topics {
        let mut previous: Vec<String> = current
            .topics
            .iter()
            .flatten()
            .map(|t| t.to_lowercase())
            .collect();
        previous.sort();
        previous.dedup();
        if &previous != topics {
            ops.push(ChangeOperation {
                category: Category::GeneralSettings,
                action: ChangeAction::Update,
                key: "topics".to_string(),
                change: Change::Topics {
                    desired: topics.clone(),
                    previous,
                },
            });
        }
    }

    ops
}

fn branch_protection(
    current: &CurrentState,
    desired: &RepoConfig,
    skipped: &mut Vec<SkippedItem>,
) -> Vec<ChangeOperation> {
    let Some(rules) = &desired.branch_protection_rules else {
        return Vec::new();
    };

    let mut ops = Vec::new();
    for rule in rules {
        let rule = rule.clone().normalized();
        if current.branch_exists(&rule.pattern) == Some(false) {
            skip(
                skipped,
                Category::BranchProtection,
                &rule.pattern,
                format!("branch '{}' does not exist", rule.pattern),
            );
            continue;
        }

        let existing = current
            .branch_protection
            .as_ref()
            .and_then(|p| p.get(&rule.pattern))
            .and_then(Option::as_ref);
        match existing {
            None => ops.push(ChangeOperation {
                category: Category::BranchProtection,
                action: ChangeAction::Create,
                key: rule.pattern.clone(),
                change: Change::Protection {
                    desired: rule,
                    previous: None,
                },
            }),
            Some(existing) if !existing.differences(&rule).is_empty() => {
                ops.push(ChangeOperation {
                    category: Category::BranchProtection,
                    action: ChangeAction::Update,
                    key: rule.pattern.clone(),
                    change: Change::Protection {
                        desired: rule,
                        previous: Some(existing.clone()),
                    },
                })
            }
            Some(_) => {}
        }
    }
    ops
}

fn label_differs(existing: &Label, desired: &Label) -> bool {
    if existing.name != desired.name || existing.color.to_lowercase() != desired.color {
        return true;
    }
    match &desired.description {
        Some(description) => existing.description.as_deref().unwrap_or("") != description,
        None => false,
    }
}

fn labels(current: &CurrentState, desired: &RepoConfig) -> Vec<ChangeOperation> {
    let Some(wanted) = &desired.labels else {
        return Vec::new();
    };

    let existing: BTreeMap<String, &Label> = current
        .labels
        .iter()
        .flatten()
        .map(|l| (l.key(), l))
        .collect();
    let wanted_keys: Vec<String> = wanted.iter().map(Label::key).collect();

    let mut ops = Vec::new();
    for label in wanted {
        match existing.get(&label.key()) {
            None => ops.push(ChangeOperation {
                category: Category::Labels,
                action: ChangeAction::Create,
                key: label.key(),
                change: Change::Label {
                    desired: label.clone(),
                    previous: None,
                },
            }),
            Some(&found) if label_differs(found, label) => ops.push(ChangeOperation {
                category: Category::Labels,
                action: ChangeAction::Update,
                key: label.key(),
                change: Change::Label {
                    desired: label.clone(),
                    previous: Some(found.clone()),
                },
            }),
            Some(_) => {}
        }
    }

    for (key, &found) in &existing {
        if wanted_keys.contains(key) || !desired.label_policy.allows_delete(&found.name) {
            continue;
        }
        ops.push(ChangeOperation {
            category: Category::Labels,
            action: ChangeAction::Delete,
            key: key.clone(),
            change: Change::RemoveLabel {
                previous: found.clone(),
            },
        });
    }
    ops
}

fn collaborators(current: &CurrentState, desired: &RepoConfig) -> Vec<ChangeOperation> {
    let Some(wanted) = &desired.collaborators else {
        return Vec::new();
    };

    let existing: BTreeMap<String, Permission> = current
        .collaborators
        .iter()
        .flatten()
        .map(|e| (e.principal.key(), e.permission))
        .collect();

    wanted
        .iter()
        .filter_map(|entry| {
            let key = entry.principal.key();
            let (action, previous) = match existing.get(&key) {
                None => (ChangeAction::Create, None),
                Some(&permission) if permission != entry.permission => {
                    (ChangeAction::Update, Some(permission))
                }
                Some(_) => return None,
            };
            Some(ChangeOperation {
                category: Category::Collaborators,
                action,
                key,
                change: Change::Permission {
                    desired: entry.clone(),
                    previous,
                },
            })
        })
        .collect()
}
