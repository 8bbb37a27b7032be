//! Current-state snapshot

use std::collections::{BTreeMap, BTreeSet};

use reposync_github::RepositoryInfo;
use reposync_meta::{BranchProtectionRule, CollaboratorEntry, Label};

/// Live repository state, read once at the start of a pass.
///
/// Mirrors the shape of [`RepoConfig`](reposync_meta::RepoConfig): a field is
/// `None` when the corresponding category was not read because the desired
/// config does not manage it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentState {
    /// Always read; doubles as the accessibility probe.
    pub repository: RepositoryInfo,
    pub topics: Option<Vec<String>>,
    /// Existing branch names; read when protection rules or a default-branch
    /// override are managed.
    pub branches: Option<BTreeSet<String>>,
    /// Protection per desired pattern whose branch exists. An entry of
    /// `None` means the branch is unprotected.
    pub branch_protection: Option<BTreeMap<String, Option<BranchProtectionRule>>>,
    pub labels: Option<Vec<Label>>,
    /// Users, pending user invitations and teams together.
    pub collaborators: Option<Vec<CollaboratorEntry>>,
}

impl CurrentState {
    /// A snapshot holding only repository metadata.
    pub fn new(repository: RepositoryInfo) -> Self {
        Self {
            repository,
            topics: None,
            branches: None,
            branch_protection: None,
            labels: None,
            collaborators: None,
        }
    }

    /// Whether `branch` is known to exist. Unknown when branches were not read.
    pub fn branch_exists(&self, branch: &str) -> Option<bool> {
        self.branches.as_ref().map(|b| b.contains(branch))
    }
}
