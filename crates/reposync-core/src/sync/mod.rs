//! Reconciliation of one repository's live settings with its desired state
//!
//! This module provides:
//! - **reader**: fetch current state for the managed categories
//! - **reconcile**: pure diff producing an ordered [`ChangePlan`]
//! - **apply**: execute a plan with per-operation failure isolation
//! - **engine**: the pass state machine and parallel entry point

mod apply;
mod engine;
mod plan;
mod reader;
mod reconcile;
mod report;
mod retry;
mod snapshot;

pub use apply::Applier;
pub use engine::{JobResult, PassState, SyncEngine, SyncJob};
pub use plan::{Change, ChangeAction, ChangeOperation, ChangePlan, SkippedItem};
pub use reader::StateReader;
pub use reconcile::reconcile;
pub use report::{CategoryOutcome, OperationFailure, PassOutcome, ReconciliationReport};
pub use retry::RetryPolicy;
pub use snapshot::CurrentState;
