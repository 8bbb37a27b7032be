//! Command implementations for reposync-cli

pub mod event;
pub mod plan;
pub mod sync;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use reposync_core::{EngineSettings, RetryPolicy, load_remote_config};
use reposync_github::{GitHubApi, RestClient};
use reposync_meta::{RepoConfig, RepoIdentifier, load_config_file};

use crate::cli::Cli;
use crate::error::{CliError, Result};

pub use event::run_handle_event;
pub use plan::run_plan;
pub use sync::run_sync;
pub use validate::run_validate;

/// Settings and an authenticated client, shared by the commands that talk
/// to GitHub.
pub struct Context {
    pub settings: EngineSettings,
    pub client: Arc<dyn GitHubApi>,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let settings = match cli.settings.clone().or_else(EngineSettings::default_path) {
            Some(path) => EngineSettings::load(&path)?,
            None => EngineSettings::default(),
        };

        let token = cli
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| CliError::user("No GitHub token: set GITHUB_TOKEN or pass --token"))?;
        let api_url = cli.api_url.as_deref().unwrap_or(&settings.github.api_url);
        let client = RestClient::with_base_url(token, api_url)?;

        Ok(Self {
            settings,
            client: Arc::new(client),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.settings.retry_policy()
    }
}

pub fn parse_repo(value: &str) -> Result<RepoIdentifier> {
    Ok(value.parse::<RepoIdentifier>()?)
}

/// Desired state from a local file when given, otherwise from the
/// repository's default branch.
pub async fn desired_config(
    ctx: &Context,
    repo: &RepoIdentifier,
    local: Option<&Path>,
) -> Result<Option<RepoConfig>> {
    match local {
        Some(path) => Ok(load_config_file(path)?),
        None => Ok(load_remote_config(
            ctx.client.as_ref(),
            &ctx.retry_policy(),
            repo,
            &ctx.settings.github.config_path,
            None,
        )
        .await?),
    }
}
