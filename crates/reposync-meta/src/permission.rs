//! Collaborator and team permissions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Repository permission level.
///
/// Ordered from least to most privileged. GitHub's legacy names `pull` and
/// `push` are accepted as aliases of `read` and `write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Permission {
    Read,
    Triage,
    Write,
    Maintain,
    Admin,
}

impl Permission {
    /// The value the REST API expects in `permission` request fields.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Read => "pull",
            Self::Triage => "triage",
            Self::Write => "push",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Triage => "triage",
            Self::Write => "write",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "read" | "pull" => Ok(Self::Read),
            "triage" => Ok(Self::Triage),
            "write" | "push" => Ok(Self::Write),
            "maintain" => Ok(Self::Maintain),
            "admin" => Ok(Self::Admin),
            _ => Err(Error::InvalidPermission {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Permission {
    type Error = Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a permission is granted to.
///
/// Logins and team slugs are case-insensitive on GitHub, so both are stored
/// lowercased. Users sort before teams.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "name")]
pub enum Principal {
    User(String),
    Team(String),
}

impl Principal {
    pub fn user(login: impl AsRef<str>) -> Self {
        Self::User(login.as_ref().trim().to_lowercase())
    }

    pub fn team(slug: impl AsRef<str>) -> Self {
        Self::Team(slug.as_ref().trim().to_lowercase())
    }

    /// Natural key used to match desired against current entries.
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn name(&self) -> &str {
        match self {
            Self::User(name) | Self::Team(name) => name,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(login) => write!(f, "{}", login),
            Self::Team(slug) => write!(f, "team:{}", slug),
        }
    }
}

/// A permission grant for one user or team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorEntry {
    pub principal: Principal,
    pub permission: Permission,
}

impl CollaboratorEntry {
    pub fn user(login: impl AsRef<str>, permission: Permission) -> Self {
        Self {
            principal: Principal::user(login),
            permission,
        }
    }

    pub fn team(slug: impl AsRef<str>, permission: Permission) -> Self {
        Self {
            principal: Principal::team(slug),
            permission,
        }
    }
}
