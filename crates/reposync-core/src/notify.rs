//! Invalid-config notification
//!
//! When a repository's desired-state file is rejected, its owners are told
//! through a single open issue. Re-running against the same broken file
//! refreshes that issue instead of opening another one. A config proposed in
//! a pull request is reported as a check run on the head commit instead.

use reposync_github::{CheckConclusion, CheckRun, GitHubApi, Result as ApiResult};
use reposync_meta::{ConfigError, RepoIdentifier};
use tracing::info;

use crate::sync::RetryPolicy;

/// Title of the issue opened for a rejected config file.
pub const INVALID_CONFIG_ISSUE_TITLE: &str = "reposync: invalid sync-repo-settings.yaml";

/// Name of the check run posted on pull requests that change the config.
pub const CONFIG_CHECK_NAME: &str = "reposync: sync-repo-settings.yaml";

/// Check run reporting whether the config at `head_sha` is accepted.
pub fn config_check_run(path: &str, head_sha: &str, result: Result<(), &ConfigError>) -> CheckRun {
    let (conclusion, title, summary) = match result {
        Ok(()) => (
            CheckConclusion::Success,
            format!("{path} is valid"),
            format!("`{path}` will be applied when this pull request is merged."),
        ),
        Err(error) => (
            CheckConclusion::Failure,
            format!("{path} is invalid"),
            ConfigIssueReporter::body(error),
        ),
    };
    CheckRun {
        name: CONFIG_CHECK_NAME.to_string(),
        head_sha: head_sha.to_string(),
        conclusion,
        title,
        summary,
    }
}

pub struct ConfigIssueReporter<'a> {
    client: &'a dyn GitHubApi,
    retry: &'a RetryPolicy,
}

impl<'a> ConfigIssueReporter<'a> {
    pub fn new(client: &'a dyn GitHubApi, retry: &'a RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Issue body describing `error`.
    pub fn body(error: &ConfigError) -> String {
        match error {
            ConfigError::Syntax {
                source_name,
                message,
            } => format!(
                "`{source_name}` could not be parsed as YAML, so repository settings were not synced.\n\n\
                 ```\n{message}\n```\n\n\
                 Fix the syntax and push the file again. This issue is updated on every failed run."
            ),
            ConfigError::Schema {
                source_name,
                issues,
            } => {
                let list: String = issues.iter().map(|i| format!("- {i}\n")).collect();
                format!(
                    "`{source_name}` is valid YAML but does not match the settings schema, \
                     so repository settings were not synced.\n\n\
                     {list}\n\
                     Fix the listed fields and push the file again. This issue is updated on every failed run."
                )
            }
        }
    }

    /// Open an issue for `error`, or refresh the body of the one already open.
    ///
    /// Returns the issue number.
    pub async fn report(&self, repo: &RepoIdentifier, error: &ConfigError) -> ApiResult<u64> {
        let body = Self::body(error);
        let client = self.client;

        let existing = self
            .retry
            .run("find_open_issue", || {
                client.find_open_issue(repo, INVALID_CONFIG_ISSUE_TITLE)
            })
            .await?;

        match existing {
            Some(number) => {
                self.retry
                    .run("update_issue", || client.update_issue(repo, number, &body))
                    .await?;
                info!(repo = %repo, issue = number, "updated invalid-config issue");
                Ok(number)
            }
            None => {
                let number = self
                    .retry
                    .run("create_issue", || {
                        client.create_issue(repo, INVALID_CONFIG_ISSUE_TITLE, &body)
                    })
                    .await?;
                info!(repo = %repo, issue = number, "opened invalid-config issue");
                Ok(number)
            }
        }
    }
}
