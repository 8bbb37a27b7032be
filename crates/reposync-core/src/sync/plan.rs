//! Change operations produced by the reconciler

use std::fmt;

use reposync_meta::{
    BranchProtectionRule, Category, CollaboratorEntry, GeneralSettings, Label, Permission,
};
use serde::{Deserialize, Serialize};

/// What an operation does to its item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// The payload of an operation: the desired value and, when it exists, the
/// value being replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Change {
    /// Every changed scalar setting, applied in one request.
    Settings {
        patch: GeneralSettings,
        previous: GeneralSettings,
    },
    Topics {
        desired: Vec<String>,
        previous: Vec<String>,
    },
    Protection {
        desired: BranchProtectionRule,
        previous: Option<BranchProtectionRule>,
    },
    Label {
        desired: Label,
        previous: Option<Label>,
    },
    RemoveLabel {
        previous: Label,
    },
    Permission {
        desired: CollaboratorEntry,
        previous: Option<Permission>,
    },
}

/// One create/update/delete against one keyed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeOperation {
    pub category: Category,
    pub action: ChangeAction,
    /// Natural key of the item within its category.
    pub key: String,
    pub change: Change,
}

impl ChangeOperation {
    /// One-line human description, including previous values.
    pub fn describe(&self) -> String {
        match &self.change {
            Change::Settings { patch, previous } => {
                let fields = patch.field_names();
                let from = serde_json::to_string(previous).unwrap_or_default();
                let to = serde_json::to_string(patch).unwrap_or_default();
                format!("update settings {}: {from} -> {to}", fields.join(", "))
            }
            Change::Topics { desired, previous } => format!(
                "replace topics [{}] with [{}]",
                previous.join(", "),
                desired.join(", ")
            ),
            Change::Protection {
                desired,
                previous: None,
            } => format!("protect branch {}", desired.pattern),
            Change::Protection {
                desired,
                previous: Some(previous),
            } => format!(
                "update protection on {}: {}",
                desired.pattern,
                previous.differences(desired).join(", ")
            ),
            Change::Label {
                desired,
                previous: None,
            } => format!("create label '{}' (#{})", desired.name, desired.color),
            Change::Label {
                desired,
                previous: Some(previous),
            } => format!(
                "update label '{}' (#{}) -> '{}' (#{})",
                previous.name, previous.color, desired.name, desired.color
            ),
            Change::RemoveLabel { previous } => format!("delete label '{}'", previous.name),
            Change::Permission {
                desired,
                previous: None,
            } => format!("grant {} to {}", desired.permission, desired.principal),
            Change::Permission {
                desired,
                previous: Some(previous),
            } => format!(
                "change {} from {} to {}",
                desired.principal, previous, desired.permission
            ),
        }
    }
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A desired item the reconciler could not act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub category: Category,
    pub key: String,
    pub reason: String,
}

/// Ordered output of the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangePlan {
    /// Grouped by category in application order, sorted by key within each.
    pub operations: Vec<ChangeOperation>,
    pub skipped: Vec<SkippedItem>,
}

impl ChangePlan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn for_category(&self, category: Category) -> impl Iterator<Item = &ChangeOperation> {
        self.operations
            .iter()
            .filter(move |op| op.category == category)
    }
}
