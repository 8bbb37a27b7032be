//! Per-repository mutual exclusion
//!
//! Two passes against the same repository would race on the same items
//! (both creating a label, both rewriting one protection rule). [`RepoLocks`]
//! hands out one async mutex per repository; a pass holds its guard from the
//! first read until the last write. Passes for different repositories never
//! contend. Locks are keyed by [`RepoIdentifier::key`], so `Acme/Widgets`
//! and `acme/widgets` share one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use reposync_meta::RepoIdentifier;
use tokio::sync::OwnedMutexGuard;

/// In-process lock table keyed by repository.
#[derive(Debug, Clone, Default)]
pub struct RepoLocks {
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

/// Held for the duration of one pass; released on drop.
#[derive(Debug)]
pub struct RepoGuard {
    _guard: OwnedMutexGuard<()>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other pass holds `repo`, then take it.
    pub async fn acquire(&self, repo: &RepoIdentifier) -> RepoGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(repo.key()).or_default().clone()
        };
        RepoGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Whether a pass currently holds `repo`.
    pub fn is_held(&self, repo: &RepoIdentifier) -> bool {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.get(&repo.key()).is_some_and(|l| l.try_lock().is_err())
    }
}
