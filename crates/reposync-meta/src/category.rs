//! Managed categories of repository configuration

use std::fmt;

use serde::{Deserialize, Serialize};

/// One managed aspect of a repository.
///
/// The declaration order is the order in which changes are planned and
/// applied: general settings (which may move the default branch) come before
/// branch protection, which comes before labels and collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    GeneralSettings,
    BranchProtection,
    Labels,
    Collaborators,
}

impl Category {
    /// All categories in application order.
    pub const ALL: [Category; 4] = [
        Category::GeneralSettings,
        Category::BranchProtection,
        Category::Labels,
        Category::Collaborators,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralSettings => "general-settings",
            Self::BranchProtection => "branch-protection",
            Self::Labels => "labels",
            Self::Collaborators => "collaborators",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_matches_application_order() {
        let mut shuffled = vec![
            Category::Collaborators,
            Category::GeneralSettings,
            Category::Labels,
            Category::BranchProtection,
        ];
        shuffled.sort();
        assert_eq!(shuffled, Category::ALL.to_vec());
    }

    #[test]
    fn test_display() {
        assert_eq!(Category::BranchProtection.to_string(), "branch-protection");
    }
}
