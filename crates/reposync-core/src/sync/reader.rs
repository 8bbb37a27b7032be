//! Remote State Reader
//!
//! Reads only the categories the desired config addresses. Repository
//! metadata is always read first; if that fails the repository is treated
//! as unreachable and nothing else is fetched.

use std::collections::{BTreeMap, BTreeSet};

use reposync_github::{Error as ApiError, ErrorClass, GitHubApi};
use reposync_meta::{RepoConfig, RepoIdentifier};
use tracing::debug;

use super::retry::RetryPolicy;
use super::snapshot::CurrentState;
use crate::error::ReadError;

pub struct StateReader<'a> {
    client: &'a dyn GitHubApi,
    repo: &'a RepoIdentifier,
    retry: &'a RetryPolicy,
}

impl<'a> StateReader<'a> {
    pub fn new(client: &'a dyn GitHubApi, repo: &'a RepoIdentifier, retry: &'a RetryPolicy) -> Self {
        Self {
            client,
            repo,
            retry,
        }
    }

    fn classify(&self, error: ApiError) -> ReadError {
        match (error.class(), error.status_code()) {
            (ErrorClass::NotFound | ErrorClass::Forbidden, Some(status)) => {
                ReadError::Inaccessible {
                    repo: self.repo.clone(),
                    status,
                }
            }
            _ => ReadError::Unavailable {
                repo: self.repo.clone(),
                source: error,
            },
        }
    }

    /// Read current state for the categories `desired` manages.
    ///
    /// `default_branch` is a hint from the trigger; that branch is taken to
    /// exist even if the branch listing predates it. An archived repository
    /// is returned with metadata only, since nothing can be written to it.
    pub async fn read(
        &self,
        desired: &RepoConfig,
        default_branch: Option<&str>,
    ) -> Result<CurrentState, ReadError> {
        let client = self.client;
        let repo = self.repo;

        let repository = self
            .retry
            .run("get_repository", || client.get_repository(repo))
            .await
            .map_err(|e| self.classify(e))?;
        let mut state = CurrentState::new(repository);
        if state.repository.archived {
            debug!("repository is archived, skipping category reads");
            return Ok(state);
        }

        if desired.topics.is_some() {
            let topics = self
                .retry
                .run("get_topics", || client.get_topics(repo))
                .await
                .map_err(|e| self.classify(e))?;
            state.topics = Some(topics);
        }

        let rules = desired.branch_protection_rules.as_deref();
        if rules.is_some() || desired.settings.default_branch.is_some() {
            let mut branches: BTreeSet<String> = self
                .retry
                .run("list_branches", || client.list_branches(repo))
                .await
                .map_err(|e| self.classify(e))?
                .into_iter()
                .collect();
            branches.insert(state.repository.default_branch.clone());
            if let Some(hint) = default_branch {
                branches.insert(hint.to_string());
            }
            state.branches = Some(branches);
        }

        if let Some(rules) = rules {
            let mut protection = BTreeMap::new();
            for rule in rules {
                if state.branch_exists(&rule.pattern) != Some(true) {
                    continue;
                }
                let branch = rule.pattern.as_str();
                let current = self
                    .retry
                    .run("get_branch_protection", || {
                        client.get_branch_protection(repo, branch)
                    })
                    .await
                    .map_err(|e| self.classify(e))?;
                protection.insert(rule.pattern.clone(), current);
            }
            state.branch_protection = Some(protection);
        }

        if desired.labels.is_some() {
            let labels = self
                .retry
                .run("list_labels", || client.list_labels(repo))
                .await
                .map_err(|e| self.classify(e))?;
            state.labels = Some(labels);
        }

        if desired.collaborators.is_some() {
            let mut entries = self
                .retry
                .run("list_collaborators", || client.list_collaborators(repo))
                .await
                .map_err(|e| self.classify(e))?;
            // a pending invitation already carries the permission it grants
            let invitations = self
                .retry
                .run("list_invitations", || client.list_invitations(repo))
                .await
                .map_err(|e| self.classify(e))?;
            for invited in invitations {
                if !entries.iter().any(|e| e.principal == invited.principal) {
                    entries.push(invited);
                }
            }
            let teams = self
                .retry
                .run("list_teams", || client.list_teams(repo))
                .await
                .map_err(|e| self.classify(e))?;
            entries.extend(teams);
            state.collaborators = Some(entries);
        }

        debug!(
            categories = ?desired.managed_categories(),
            "current state read"
        );
        Ok(state)
    }
}
