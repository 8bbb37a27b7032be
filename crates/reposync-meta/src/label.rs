//! Label definitions and the label deletion policy

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9a-f]{3}|[0-9a-f]{6})$").unwrap());

/// Labels GitHub creates in every new repository.
///
/// Under [`LabelDeletion::DenyList`] these are removed when the repository
/// manages its labels and does not list them.
pub const DEFAULT_LABEL_DENY_LIST: &[&str] = &[
    "bug",
    "documentation",
    "duplicate",
    "enhancement",
    "good first issue",
    "help wanted",
    "invalid",
    "question",
    "wontfix",
];

/// Normalize a label color to six lowercase hex digits without `#`.
///
/// Three-digit shorthand is expanded (`fa0` becomes `ffaa00`).
pub fn normalize_color(raw: &str) -> crate::Result<String> {
    let trimmed = raw.trim().trim_start_matches('#').to_lowercase();
    if !HEX_COLOR.is_match(&trimmed) {
        return Err(Error::InvalidColor {
            value: raw.to_string(),
        });
    }
    if trimmed.len() == 3 {
        return Ok(trimmed.chars().flat_map(|c| [c, c]).collect());
    }
    Ok(trimmed)
}

/// A label definition.
///
/// `description: None` means the description is not managed; it is never
/// compared or overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Label {
    /// Create a label, normalizing its color.
    pub fn new(name: impl Into<String>, color: &str) -> crate::Result<Self> {
        Ok(Self {
            name: name.into(),
            color: normalize_color(color)?,
            description: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Natural key: label names are case-insensitive on GitHub.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// What happens to labels that exist on the repository but not in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelDeletion {
    /// Never delete.
    Additive,
    /// Delete only labels on the deny list.
    #[default]
    DenyList,
    /// Delete every label not listed in the config.
    Exhaustive,
}

/// Label deletion policy for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPolicy {
    pub deletion: LabelDeletion,
    deny_list: Vec<String>,
}

impl LabelPolicy {
    pub fn new(deletion: LabelDeletion, deny_list: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut deny_list: Vec<String> = deny_list
            .into_iter()
            .map(|name| name.as_ref().trim().to_lowercase())
            .collect();
        deny_list.sort();
        deny_list.dedup();
        Self {
            deletion,
            deny_list,
        }
    }

    pub fn additive() -> Self {
        Self::new(LabelDeletion::Additive, DEFAULT_LABEL_DENY_LIST)
    }

    pub fn exhaustive() -> Self {
        Self::new(LabelDeletion::Exhaustive, DEFAULT_LABEL_DENY_LIST)
    }

    pub fn deny_list(&self) -> &[String] {
        &self.deny_list
    }

    /// Whether an unlisted label with this name may be deleted.
    pub fn allows_delete(&self, name: &str) -> bool {
        match self.deletion {
            LabelDeletion::Additive => false,
            LabelDeletion::Exhaustive => true,
            LabelDeletion::DenyList => self
                .deny_list
                .binary_search(&name.trim().to_lowercase())
                .is_ok(),
        }
    }
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self::new(LabelDeletion::DenyList, DEFAULT_LABEL_DENY_LIST)
    }
}
