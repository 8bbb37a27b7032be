//! SyncEngine implementation
//!
//! One pass runs `Start -> ReadCurrent -> Reconcile -> Apply -> Done`. A
//! failed read moves to `Failed` and nothing is applied. Apply always ends in
//! `Done`; individual operation failures are carried in the report. Passes
//! are never retried here; re-running is up to the trigger.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use reposync_github::GitHubApi;
use reposync_meta::{RepoConfig, RepoIdentifier};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::apply::Applier;
use super::plan::ChangePlan;
use super::reader::StateReader;
use super::reconcile::reconcile;
use super::report::{PassOutcome, ReconciliationReport};
use super::retry::RetryPolicy;
use crate::error::{JobError, ReadError};
use crate::lock::RepoLocks;
use crate::settings::EngineSettings;

/// States of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Start,
    ReadCurrent,
    Reconcile,
    Apply,
    Done,
    Failed,
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "START",
            Self::ReadCurrent => "READ_CURRENT",
            Self::Reconcile => "RECONCILE",
            Self::Apply => "APPLY",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

fn enter(state: PassState) {
    debug!(state = %state, "pass state");
}

/// One repository to reconcile in [`SyncEngine::reconcile_many`].
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub repo: RepoIdentifier,
    pub config: Option<RepoConfig>,
    pub default_branch: Option<String>,
}

/// Result of one job in [`SyncEngine::reconcile_many`].
pub type JobResult = (RepoIdentifier, Result<ReconciliationReport, JobError>);

/// Entry point for reconciliation passes.
///
/// Cheap to clone; clones share the per-repository lock table.
#[derive(Debug, Clone, Default)]
pub struct SyncEngine {
    retry: RetryPolicy,
    locks: RepoLocks,
}

impl SyncEngine {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            retry,
            locks: RepoLocks::new(),
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(settings.retry_policy())
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn locks(&self) -> &RepoLocks {
        &self.locks
    }

    /// Run one pass against `repo`.
    ///
    /// `config: None` means no desired state exists and yields a
    /// [`PassOutcome::NoConfig`] report without touching the API.
    /// `default_branch` is an optional hint from the trigger; when absent the
    /// live default branch is used.
    ///
    /// # Errors
    ///
    /// Returns a [`ReadError`] when the current state cannot be read. No
    /// operation is applied in that case.
    pub async fn reconcile(
        &self,
        client: &dyn GitHubApi,
        repo: &RepoIdentifier,
        config: Option<&RepoConfig>,
        default_branch: Option<&str>,
    ) -> Result<ReconciliationReport, ReadError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconcile", repo = %repo, run_id = %run_id);
        self.run_pass(client, repo, config, default_branch, run_id)
            .instrument(span)
            .await
    }

    async fn run_pass(
        &self,
        client: &dyn GitHubApi,
        repo: &RepoIdentifier,
        config: Option<&RepoConfig>,
        default_branch: Option<&str>,
        run_id: Uuid,
    ) -> Result<ReconciliationReport, ReadError> {
        enter(PassState::Start);
        let started_at = Utc::now();

        let Some(config) = config else {
            info!("no config present, nothing to sync");
            let mut report = ReconciliationReport::new(repo.clone(), run_id, PassOutcome::NoConfig);
            report.started_at = started_at;
            enter(PassState::Done);
            return Ok(report);
        };

        let _guard = self.locks.acquire(repo).await;

        enter(PassState::ReadCurrent);
        let current = match StateReader::new(client, repo, &self.retry)
            .read(config, default_branch)
            .await
        {
            Ok(current) => current,
            Err(e) => {
                warn!(error = %e, "failed to read current state, aborting pass");
                enter(PassState::Failed);
                return Err(e);
            }
        };

        let managed = config.managed_categories();
        let mut report = ReconciliationReport::new(repo.clone(), run_id, PassOutcome::Completed);
        report.started_at = started_at;
        report.default_branch = Some(
            default_branch
                .map(str::to_string)
                .unwrap_or_else(|| current.repository.default_branch.clone()),
        );

        if current.repository.archived {
            info!("repository is archived, skipping all categories");
            report.outcome = PassOutcome::Archived;
            report.skipped_categories = managed.into_iter().collect();
            report.finished_at = Utc::now();
            enter(PassState::Done);
            return Ok(report);
        }

        enter(PassState::Reconcile);
        let plan = reconcile(&current, config);
        debug!(operations = plan.len(), skipped = plan.skipped.len(), "plan computed");

        enter(PassState::Apply);
        report.categories = Applier::new(client, repo, &self.retry)
            .apply(&plan, &managed)
            .await;
        report.skipped = plan.skipped;
        report.finished_at = Utc::now();

        enter(PassState::Done);
        info!(
            attempted = report.items_attempted(),
            succeeded = report.items_succeeded(),
            "{}",
            report.summary()
        );
        Ok(report)
    }

    /// Dry run: read and reconcile without applying anything.
    ///
    /// # Errors
    ///
    /// Returns a [`ReadError`] when the current state cannot be read.
    pub async fn plan(
        &self,
        client: &dyn GitHubApi,
        repo: &RepoIdentifier,
        config: &RepoConfig,
        default_branch: Option<&str>,
    ) -> Result<ChangePlan, ReadError> {
        let span = info_span!("plan", repo = %repo);
        async {
            let current = StateReader::new(client, repo, &self.retry)
                .read(config, default_branch)
                .await?;
            if current.repository.archived {
                info!("repository is archived, nothing can be applied");
                return Ok(ChangePlan::default());
            }
            Ok(reconcile(&current, config))
        }
        .instrument(span)
        .await
    }

    /// Reconcile several repositories in parallel.
    ///
    /// Returns one result per job, in job order. A pass whose task panics is
    /// reported as [`JobError::Aborted`].
    pub async fn reconcile_many(
        &self,
        client: Arc<dyn GitHubApi>,
        jobs: Vec<SyncJob>,
    ) -> Vec<JobResult> {
        let mut set = JoinSet::new();
        let mut tasks = HashMap::new();
        for (index, job) in jobs.into_iter().enumerate() {
            let engine = self.clone();
            let client = Arc::clone(&client);
            let repo = job.repo.clone();
            let handle = set.spawn(async move {
                let result = engine
                    .reconcile(
                        client.as_ref(),
                        &job.repo,
                        job.config.as_ref(),
                        job.default_branch.as_deref(),
                    )
                    .await;
                (index, job.repo, result.map_err(JobError::from))
            });
            tasks.insert(handle.id(), (index, repo));
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    let Some((index, repo)) = tasks.get(&e.id()).cloned() else {
                        error!(error = %e, "unknown reconciliation task failed");
                        continue;
                    };
                    error!(repo = %repo, error = %e, "reconciliation task failed");
                    let aborted = JobError::Aborted {
                        repo: repo.clone(),
                        message: e.to_string(),
                    };
                    results.push((index, repo, Err(aborted)));
                }
            }
        }
        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, repo, result)| (repo, result))
            .collect()
    }
}
