//! Reconciliation engine for reposync
//!
//! This crate brings a repository's live GitHub settings in line with the
//! desired state declared in its `sync-repo-settings.yaml`:
//!
//! - **Reconciliation pass**: read current state, compute a [`ChangePlan`],
//!   apply it with per-operation failure isolation and bounded retries
//! - **Locking**: at most one pass per repository at a time ([`RepoLocks`])
//! - **Events**: turn webhook payloads into sync or validate decisions
//! - **Notification**: one issue per repository for a rejected config file
//!
//! # Architecture
//!
//! ```text
//!              CLI / webhook receiver
//!                        |
//!                  reposync-core
//!                        |
//!          +-------------+-------------+
//!          |                           |
//!   reposync-github              reposync-meta
//!   (GitHubApi, REST)        (RepoConfig, loader)
//! ```

pub mod error;
pub mod events;
pub mod handler;
pub mod lock;
pub mod notify;
pub mod settings;
pub mod sync;

pub use error::{Error, JobError, ReadError, Result};
pub use events::{Decision, EventError, EventKind, TriggerEvent};
pub use handler::{EventHandler, HandlerOutcome, load_remote_config};
pub use lock::{RepoGuard, RepoLocks};
pub use notify::{
    CONFIG_CHECK_NAME, ConfigIssueReporter, INVALID_CONFIG_ISSUE_TITLE, config_check_run,
};
pub use settings::{EngineSettings, GitHubSettings, RetrySettings};
pub use sync::{
    CategoryOutcome, Change, ChangeAction, ChangeOperation, ChangePlan, CurrentState, JobResult,
    OperationFailure, PassOutcome, PassState, ReconciliationReport, RetryPolicy, SkippedItem,
    SyncEngine, SyncJob,
};
