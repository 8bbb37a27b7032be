//! Engine settings
//!
//! Operational knobs that are not part of any repository's desired state:
//! retry budget and API location. Loaded from TOML:
//!
//! ```toml
//! [retry]
//! max_attempts = 4
//! initial_interval_ms = 500
//! max_interval_ms = 8000
//!
//! [github]
//! api_url = "https://api.github.com"
//! config_path = ".github/sync-repo-settings.yaml"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use reposync_github::DEFAULT_API_URL;
use reposync_meta::DEFAULT_CONFIG_PATH;
use serde::{Deserialize, Serialize};

use crate::sync::RetryPolicy;
use crate::{Error, Result};

/// Settings for the retry policy applied to every API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_interval_ms: 500,
            max_interval_ms: 8_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSettings {
    pub api_url: String,
    /// Location of the desired-state file inside each repository.
    pub config_path: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            config_path: DEFAULT_CONFIG_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    pub retry: RetrySettings,
    pub github: GitHubSettings,
}

impl EngineSettings {
    /// Parse settings from TOML text. Missing keys take their defaults.
    pub fn parse(content: &str) -> Result<Self> {
        let settings: EngineSettings = toml::from_str(content)?;
        Ok(settings)
    }

    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(Error::SettingsIo {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Platform config location, e.g. `~/.config/reposync/settings.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("reposync").join("settings.toml"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            initial_interval: Duration::from_millis(self.retry.initial_interval_ms),
            max_interval: Duration::from_millis(self.retry.max_interval_ms),
        }
    }
}
