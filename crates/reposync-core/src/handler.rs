//! Event handling: from a trigger to a finished pass
//!
//! Fetches the desired-state file from the repository itself, routes
//! rejected files to [`ConfigIssueReporter`], and hands valid ones to the
//! [`SyncEngine`]. Pull requests that change the file get a check run with
//! the verdict.

use std::path::Path;

use reposync_github::GitHubApi;
use reposync_meta::{CONFIG_FILE_NAME, ConfigError, DEFAULT_CONFIG_PATH, RepoConfig, RepoIdentifier, parse_config};
use tracing::{info, warn};

use crate::events::{Decision, TriggerEvent};
use crate::notify::{ConfigIssueReporter, config_check_run};
use crate::settings::EngineSettings;
use crate::sync::{ReconciliationReport, RetryPolicy, SyncEngine};
use crate::{Error, Result};

/// Fetch and parse the desired-state file at `path` in `repo`.
///
/// `git_ref` selects a commit or branch; `None` reads the default branch.
/// A missing file is `Ok(None)`.
///
/// # Errors
///
/// [`Error::Config`] when the file exists but is rejected, [`Error::GitHub`]
/// when it cannot be fetched.
pub async fn load_remote_config(
    client: &dyn GitHubApi,
    retry: &RetryPolicy,
    repo: &RepoIdentifier,
    path: &str,
    git_ref: Option<&str>,
) -> Result<Option<RepoConfig>> {
    let contents = retry
        .run("get_file_contents", || client.get_file_contents(repo, path, git_ref))
        .await?;
    match contents {
        Some(text) => Ok(parse_config(path, &text)?),
        None => {
            info!(repo = %repo, path, "config file not found");
            Ok(None)
        }
    }
}

/// What handling one event amounted to.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// A pass ran (possibly a no-config pass).
    Synced(ReconciliationReport),
    /// The config file was rejected; nothing was reconciled and the
    /// owners were notified through `issue`.
    ConfigRejected {
        repo: RepoIdentifier,
        issue: u64,
        error: ConfigError,
    },
    /// A pull request's proposed config was checked and the verdict posted
    /// as a check run on its head commit.
    Validated {
        repo: RepoIdentifier,
        pull_request: u64,
        result: std::result::Result<(), ConfigError>,
    },
    Skipped { reason: String },
}

pub struct EventHandler {
    engine: SyncEngine,
    config_path: String,
}

impl EventHandler {
    pub fn new(engine: SyncEngine, config_path: impl Into<String>) -> Self {
        Self {
            engine,
            config_path: config_path.into(),
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(
            SyncEngine::from_settings(settings),
            settings.github.config_path.clone(),
        )
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn config_path(&self) -> &str {
        &self.config_path
    }

    fn config_file_name(&self) -> &str {
        Path::new(&self.config_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(CONFIG_FILE_NAME)
    }

    /// Handle one trigger event end to end.
    ///
    /// # Errors
    ///
    /// Event errors (missing installation, bad repository), API errors while
    /// fetching the config or notifying, and [`crate::ReadError`] from the
    /// pass itself.
    pub async fn handle(&self, client: &dyn GitHubApi, event: &TriggerEvent) -> Result<HandlerOutcome> {
        let retry = self.engine.retry_policy();
        match event.decide(self.config_file_name())? {
            Decision::Skip { reason } => Ok(HandlerOutcome::Skipped { reason }),

            Decision::Validate {
                repo,
                pull_request,
                head_sha,
            } => {
                let changed = retry
                    .run("list_pull_request_files", || {
                        client.list_pull_request_files(&repo, pull_request)
                    })
                    .await?;
                if !changed.iter().any(|f| f == &self.config_path) {
                    return Ok(HandlerOutcome::Skipped {
                        reason: format!(
                            "pull request #{pull_request} does not change {}",
                            self.config_path
                        ),
                    });
                }

                let result =
                    match load_remote_config(client, retry, &repo, &self.config_path, Some(&head_sha)).await {
                        Ok(_) => Ok(()),
                        Err(Error::Config(e)) => {
                            warn!(repo = %repo, pull_request, error = %e, "proposed config is invalid");
                            Err(e)
                        }
                        Err(e) => return Err(e),
                    };

                let run = config_check_run(&self.config_path, &head_sha, result.as_ref().map(|_| ()));
                retry
                    .run("create_check_run", || client.create_check_run(&repo, &run))
                    .await?;
                info!(repo = %repo, pull_request, conclusion = run.conclusion.as_str(), "posted config check");

                Ok(HandlerOutcome::Validated {
                    repo,
                    pull_request,
                    result,
                })
            }

            Decision::Sync {
                repo,
                default_branch,
            } => match load_remote_config(client, retry, &repo, &self.config_path, None).await {
                Ok(config) => {
                    let report = self
                        .engine
                        .reconcile(client, &repo, config.as_ref(), default_branch.as_deref())
                        .await?;
                    Ok(HandlerOutcome::Synced(report))
                }
                Err(Error::Config(error)) => {
                    warn!(repo = %repo, error = %error, "config rejected, not syncing");
                    let issue = ConfigIssueReporter::new(client, retry)
                        .report(&repo, &error)
                        .await?;
                    Ok(HandlerOutcome::ConfigRejected { repo, issue, error })
                }
                Err(e) => Err(e),
            },
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new(SyncEngine::default(), DEFAULT_CONFIG_PATH)
    }
}
