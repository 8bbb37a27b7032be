//! Applier
//!
//! Executes a [`ChangePlan`] against the API. A failed operation is recorded
//! and the next one is attempted; nothing short-circuits a category or the
//! categories after it.

use std::collections::BTreeSet;

use reposync_github::{GitHubApi, Result as ApiResult};
use reposync_meta::{Category, RepoIdentifier};
use tracing::{debug, warn};

use super::plan::{Change, ChangeOperation, ChangePlan};
use super::report::{CategoryOutcome, OperationFailure};
use super::retry::RetryPolicy;

pub struct Applier<'a> {
    client: &'a dyn GitHubApi,
    repo: &'a RepoIdentifier,
    retry: &'a RetryPolicy,
}

impl<'a> Applier<'a> {
    pub fn new(client: &'a dyn GitHubApi, repo: &'a RepoIdentifier, retry: &'a RetryPolicy) -> Self {
        Self {
            client,
            repo,
            retry,
        }
    }

    /// Apply every operation, returning one outcome per managed category in
    /// application order.
    pub async fn apply(
        &self,
        plan: &ChangePlan,
        managed: &BTreeSet<Category>,
    ) -> Vec<CategoryOutcome> {
        let mut outcomes = Vec::new();
        for &category in managed {
            let mut outcome = CategoryOutcome::new(category);
            for op in plan.for_category(category) {
                outcome.items_attempted += 1;
                match self.execute(op).await {
                    Ok(()) => {
                        debug!(category = %category, key = %op.key, "{}", op.describe());
                        outcome.items_succeeded += 1;
                    }
                    Err(e) => {
                        warn!(
                            category = %category,
                            key = %op.key,
                            action = %op.action,
                            error = %e,
                            "operation failed"
                        );
                        outcome.errors.push(OperationFailure {
                            key: op.key.clone(),
                            action: op.action,
                            class: e.class().to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn execute(&self, op: &ChangeOperation) -> ApiResult<()> {
        let client = self.client;
        let repo = self.repo;
        match &op.change {
            Change::Settings { patch, .. } => {
                self.retry
                    .run("update_repository", || client.update_repository(repo, patch))
                    .await
            }
            Change::Topics { desired, .. } => {
                self.retry
                    .run("replace_topics", || client.replace_topics(repo, desired))
                    .await
            }
            Change::Protection { desired, .. } => {
                self.retry
                    .run("update_branch_protection", || {
                        client.update_branch_protection(repo, desired)
                    })
                    .await
            }
            Change::Label {
                desired,
                previous: None,
            } => {
                self.retry
                    .run("create_label", || client.create_label(repo, desired))
                    .await
            }
            Change::Label {
                desired,
                previous: Some(previous),
            } => {
                self.retry
                    .run("update_label", || {
                        client.update_label(repo, &previous.name, desired)
                    })
                    .await
            }
            Change::RemoveLabel { previous } => {
                self.retry
                    .run("delete_label", || client.delete_label(repo, &previous.name))
                    .await
            }
            Change::Permission { desired, .. } => {
                self.retry
                    .run("set_permission", || client.set_permission(repo, desired))
                    .await
            }
        }
    }
}
