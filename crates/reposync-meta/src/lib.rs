//! Desired-state configuration model for reposync.
//!
//! This crate provides the typed representation of a repository's
//! `sync-repo-settings.yaml` and the loader that turns YAML text into it:
//!
//! - [`RepoConfig`] - the validated desired state, one optional field per category
//! - [`RepoIdentifier`] - the `owner/repo` pair a pass runs against
//! - [`Label`], [`BranchProtectionRule`], [`CollaboratorEntry`] - keyed items
//! - [`parse_config`] / [`load_config_file`] - YAML loading with a closed
//!   [`ConfigError`] for syntax versus schema failures

pub mod category;
pub mod config;
pub mod error;
pub mod label;
pub mod loader;
pub mod permission;
pub mod protection;
pub mod repo_id;

pub use category::Category;
pub use config::{GeneralSettings, RepoConfig};
pub use error::{ConfigError, Error, Result};
pub use label::{DEFAULT_LABEL_DENY_LIST, Label, LabelDeletion, LabelPolicy, normalize_color};
pub use loader::{CONFIG_FILE_NAME, DEFAULT_CONFIG_PATH, load_config_file, parse_config};
pub use permission::{CollaboratorEntry, Permission, Principal};
pub use protection::BranchProtectionRule;
pub use repo_id::RepoIdentifier;
