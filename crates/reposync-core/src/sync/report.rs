//! Reconciliation reports

use chrono::{DateTime, Utc};
use reposync_meta::{Category, RepoIdentifier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plan::{ChangeAction, SkippedItem};

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassOutcome {
    /// No desired state exists; nothing was read or written.
    NoConfig,
    /// Every planned operation was attempted.
    Completed,
    /// The repository is archived and read-only; every category was skipped.
    Archived,
}

/// A planned operation that failed permanently or ran out of retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub key: String,
    pub action: ChangeAction,
    /// Error class, e.g. `validation` or `rate-limited`
    pub class: String,
    pub message: String,
}

/// Result of applying one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOutcome {
    pub category: Category,
    pub items_attempted: usize,
    pub items_succeeded: usize,
    pub errors: Vec<OperationFailure>,
}

impl CategoryOutcome {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            items_attempted: 0,
            items_succeeded: 0,
            errors: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Everything one pass did, for logging and notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub repo: RepoIdentifier,
    pub run_id: Uuid,
    /// The hint when one was given, otherwise the live default branch.
    /// Absent when nothing was read.
    pub default_branch: Option<String>,
    pub outcome: PassOutcome,
    /// Managed categories in application order.
    pub categories: Vec<CategoryOutcome>,
    pub skipped_categories: Vec<Category>,
    pub skipped: Vec<SkippedItem>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ReconciliationReport {
    pub fn new(repo: RepoIdentifier, run_id: Uuid, outcome: PassOutcome) -> Self {
        let now = Utc::now();
        Self {
            repo,
            run_id,
            default_branch: None,
            outcome,
            categories: Vec::new(),
            skipped_categories: Vec::new(),
            skipped: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// True when no operation failed.
    pub fn is_success(&self) -> bool {
        self.categories.iter().all(CategoryOutcome::is_success)
    }

    pub fn items_attempted(&self) -> usize {
        self.categories.iter().map(|c| c.items_attempted).sum()
    }

    pub fn items_succeeded(&self) -> usize {
        self.categories.iter().map(|c| c.items_succeeded).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = (Category, &OperationFailure)> {
        self.categories
            .iter()
            .flat_map(|c| c.errors.iter().map(move |e| (c.category, e)))
    }

    pub fn category(&self, category: Category) -> Option<&CategoryOutcome> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        match self.outcome {
            PassOutcome::NoConfig => format!("{}: no config, nothing to sync", self.repo),
            PassOutcome::Archived => format!("{}: archived, skipped", self.repo),
            PassOutcome::Completed => format!(
                "{}: {}/{} operations succeeded across {} categories",
                self.repo,
                self.items_succeeded(),
                self.items_attempted(),
                self.categories.len()
            ),
        }
    }
}
