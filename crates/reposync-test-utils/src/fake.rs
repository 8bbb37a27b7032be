//! In-memory GitHub for engine tests.
//!
//! [`FakeGitHub`] keeps one [`FakeRepo`] per identifier and applies writes
//! to it the way the real API would, including the validation errors the
//! engine has to cope with (unknown branch, duplicate label, archived
//! repository). Every call is recorded, and failures can be injected per
//! operation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use reposync_github::{CheckRun, Error, GitHubApi, RepositoryInfo, Result};
use reposync_meta::{
    BranchProtectionRule, CollaboratorEntry, GeneralSettings, Label, Principal, RepoIdentifier,
};

/// The API operations, as recorded in [`Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetRepository,
    UpdateRepository,
    GetTopics,
    ReplaceTopics,
    ListBranches,
    GetBranchProtection,
    UpdateBranchProtection,
    ListLabels,
    CreateLabel,
    UpdateLabel,
    DeleteLabel,
    ListCollaborators,
    ListInvitations,
    ListTeams,
    SetPermission,
    GetFileContents,
    FindOpenIssue,
    CreateIssue,
    UpdateIssue,
    ListPullRequestFiles,
    CreateCheckRun,
}

impl Op {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::UpdateRepository
                | Self::ReplaceTopics
                | Self::UpdateBranchProtection
                | Self::CreateLabel
                | Self::UpdateLabel
                | Self::DeleteLabel
                | Self::SetPermission
                | Self::CreateIssue
                | Self::UpdateIssue
                | Self::CreateCheckRun
        )
    }

    fn method(&self) -> &'static str {
        match self {
            Self::UpdateRepository | Self::UpdateLabel | Self::UpdateIssue => "PATCH",
            Self::ReplaceTopics | Self::UpdateBranchProtection | Self::SetPermission => "PUT",
            Self::CreateLabel | Self::CreateIssue | Self::CreateCheckRun => "POST",
            Self::DeleteLabel => "DELETE",
            _ => "GET",
        }
    }
}

/// One recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub repo: RepoIdentifier,
    pub op: Op,
    /// Branch, label name, principal key or file path; empty when the
    /// operation has no target.
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeIssue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub open: bool,
}

/// Server-side state of one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeRepo {
    pub settings: GeneralSettings,
    pub archived: bool,
    pub topics: Vec<String>,
    pub branches: Vec<String>,
    pub protection: BTreeMap<String, BranchProtectionRule>,
    pub labels: Vec<Label>,
    pub collaborators: Vec<CollaboratorEntry>,
    pub teams: Vec<CollaboratorEntry>,
    /// Pending collaborator invitations.
    pub invitations: Vec<CollaboratorEntry>,
    pub files: BTreeMap<String, String>,
    pub issues: Vec<FakeIssue>,
    /// Changed paths per pull request number.
    pub pull_requests: BTreeMap<u64, Vec<String>>,
    pub check_runs: Vec<CheckRun>,
}

impl FakeRepo {
    /// A fresh repository with a single branch.
    pub fn new(default_branch: &str) -> Self {
        Self {
            settings: GeneralSettings {
                description: Some(String::new()),
                homepage: Some(String::new()),
                has_issues: Some(true),
                has_wiki: Some(true),
                has_projects: Some(true),
                allow_squash_merge: Some(true),
                allow_merge_commit: Some(true),
                allow_rebase_merge: Some(true),
                allow_auto_merge: Some(false),
                delete_branch_on_merge: Some(false),
                default_branch: Some(default_branch.to_string()),
            },
            archived: false,
            topics: Vec::new(),
            branches: vec![default_branch.to_string()],
            protection: BTreeMap::new(),
            labels: Vec::new(),
            collaborators: Vec::new(),
            teams: Vec::new(),
            invitations: Vec::new(),
            files: BTreeMap::new(),
            issues: Vec::new(),
            pull_requests: BTreeMap::new(),
            check_runs: Vec::new(),
        }
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branches.push(branch.to_string());
        self
    }

    pub fn with_protection(mut self, rule: BranchProtectionRule) -> Self {
        self.protection.insert(rule.pattern.clone(), rule.normalized());
        self
    }

    pub fn with_label(mut self, name: &str, color: &str, description: &str) -> Self {
        self.labels.push(Label {
            name: name.to_string(),
            color: color.to_string(),
            description: Some(description.to_string()),
        });
        self
    }

    pub fn with_topics(mut self, topics: &[&str]) -> Self {
        self.topics = topics.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_collaborator(mut self, entry: CollaboratorEntry) -> Self {
        match entry.principal {
            Principal::User(_) => self.collaborators.push(entry),
            Principal::Team(_) => self.teams.push(entry),
        }
        self
    }

    pub fn with_invitation(mut self, entry: CollaboratorEntry) -> Self {
        self.invitations.push(entry);
        self
    }

    pub fn with_pull_request(mut self, number: u64, files: &[&str]) -> Self {
        self.pull_requests
            .insert(number, files.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files.insert(path.to_string(), contents.to_string());
        self
    }

    pub fn with_settings(mut self, edit: impl FnOnce(&mut GeneralSettings)) -> Self {
        edit(&mut self.settings);
        self
    }

    pub fn archived(mut self) -> Self {
        self.archived = true;
        self
    }

    fn default_branch(&self) -> String {
        self.settings.default_branch.clone().unwrap_or_default()
    }

    fn find_label(&self, name: &str) -> Option<usize> {
        let key = name.to_lowercase();
        self.labels.iter().position(|l| l.name.to_lowercase() == key)
    }
}

struct Failure {
    op: Op,
    target: Option<String>,
    remaining: usize,
    error: Error,
}

#[derive(Default)]
struct State {
    repos: HashMap<RepoIdentifier, FakeRepo>,
    failures: Vec<Failure>,
    panicking: HashSet<RepoIdentifier>,
    calls: Vec<Call>,
    in_flight: usize,
    max_in_flight: usize,
    writes_in_flight: HashMap<RepoIdentifier, usize>,
    max_concurrent_writes: usize,
}

impl State {
    fn take_failure(&mut self, op: Op, target: &str) -> Option<Error> {
        let failure = self.failures.iter_mut().find(|f| {
            f.op == op && f.remaining > 0 && f.target.as_deref().is_none_or(|t| t == target)
        })?;
        failure.remaining -= 1;
        Some(failure.error.clone())
    }
}

/// An in-memory [`GitHubApi`].
#[derive(Default)]
pub struct FakeGitHub {
    state: Mutex<State>,
    delay: Option<Duration>,
}

fn not_found(op: Op, path: String) -> Error {
    Error::status(op.method(), path, 404, "Not Found")
}

fn validation(op: Op, path: String, message: &str) -> Error {
    Error::status(op.method(), path, 422, message)
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, repo: &RepoIdentifier, state: FakeRepo) -> Self {
        self.insert_repo(repo, state);
        self
    }

    /// Hold every call open for `delay`, so overlapping calls can be observed.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert_repo(&self, repo: &RepoIdentifier, state: FakeRepo) {
        self.lock().repos.insert(repo.clone(), state);
    }

    /// Fail the next `times` calls of `op` with `error`.
    pub fn fail_next(&self, op: Op, times: usize, error: Error) {
        self.lock().failures.push(Failure {
            op,
            target: None,
            remaining: times,
            error,
        });
    }

    /// Fail the next `times` calls of `op` whose target is `target`.
    pub fn fail_target(&self, op: Op, target: &str, times: usize, error: Error) {
        self.lock().failures.push(Failure {
            op,
            target: Some(target.to_string()),
            remaining: times,
            error,
        });
    }

    /// Panic on every call against `repo`, as a broken client would.
    pub fn panic_on(&self, repo: &RepoIdentifier) {
        self.lock().panicking.insert(repo.clone());
    }

    /// Snapshot of a repository's server-side state.
    ///
    /// # Panics
    /// Panics if the repository was never inserted.
    pub fn repo(&self, repo: &RepoIdentifier) -> FakeRepo {
        self.lock()
            .repos
            .get(repo)
            .cloned()
            .unwrap_or_else(|| panic!("FakeGitHub: unknown repository {repo}"))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Recorded write calls against `repo`, in order.
    pub fn writes(&self, repo: &RepoIdentifier) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| &c.repo == repo && c.op.is_write())
            .cloned()
            .collect()
    }

    pub fn count(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Highest number of writes seen in flight against a single repository.
    pub fn max_concurrent_writes(&self) -> usize {
        self.lock().max_concurrent_writes
    }

    /// Highest number of calls seen in flight overall.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, repo: &RepoIdentifier, op: Op, target: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call {
            repo: repo.clone(),
            op,
            target: target.to_string(),
        });
        if state.panicking.contains(repo) {
            drop(state);
            panic!("FakeGitHub: {op:?} against {repo} panicked");
        }
        if let Some(err) = state.take_failure(op, target) {
            return Err(err);
        }
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        if op.is_write() {
            let writes = state.writes_in_flight.entry(repo.clone()).or_default();
            *writes += 1;
            let writes = *writes;
            state.max_concurrent_writes = state.max_concurrent_writes.max(writes);
        }
        Ok(())
    }

    /// Record the call, wait out the configured delay, then run `apply`
    /// against the repository's state.
    async fn call<T, F>(&self, repo: &RepoIdentifier, op: Op, target: &str, apply: F) -> Result<T>
    where
        F: FnOnce(&mut FakeRepo, String) -> Result<T> + Send,
        T: Send,
    {
        self.enter(repo, op, target)?;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.in_flight -= 1;
        if op.is_write() {
            if let Some(writes) = state.writes_in_flight.get_mut(repo) {
                *writes -= 1;
            }
        }

        let path = format!("/repos/{repo}");
        let Some(current) = state.repos.get_mut(repo) else {
            return Err(not_found(op, path));
        };
        if op.is_write() && current.archived && !matches!(op, Op::CreateIssue | Op::UpdateIssue) {
            return Err(Error::status(
                op.method(),
                path,
                403,
                "Repository was archived so is read-only.",
            ));
        }
        apply(current, path)
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn get_repository(&self, repo: &RepoIdentifier) -> Result<RepositoryInfo> {
        self.call(repo, Op::GetRepository, "", |r, _| {
            Ok(RepositoryInfo {
                settings: r.settings.clone(),
                default_branch: r.default_branch(),
                archived: r.archived,
            })
        })
        .await
    }

    async fn update_repository(&self, repo: &RepoIdentifier, patch: &GeneralSettings) -> Result<()> {
        self.call(repo, Op::UpdateRepository, "", |r, path| {
            if let Some(branch) = &patch.default_branch {
                if !r.branches.contains(branch) {
                    return Err(validation(
                        Op::UpdateRepository,
                        path,
                        "Validation Failed: default_branch does not exist",
                    ));
                }
            }
            let s = &mut r.settings;
            macro_rules! merge {
                ($($field:ident),*) => {
                    $(if let Some(value) = &patch.$field {
                        s.$field = Some(value.clone());
                    })*
                };
            }
            merge!(
                description,
                homepage,
                has_issues,
                has_wiki,
                has_projects,
                allow_squash_merge,
                allow_merge_commit,
                allow_rebase_merge,
                allow_auto_merge,
                delete_branch_on_merge,
                default_branch
            );
            Ok(())
        })
        .await
    }

    async fn get_topics(&self, repo: &RepoIdentifier) -> Result<Vec<String>> {
        self.call(repo, Op::GetTopics, "", |r, _| Ok(r.topics.clone()))
            .await
    }

    async fn replace_topics(&self, repo: &RepoIdentifier, topics: &[String]) -> Result<()> {
        self.call(repo, Op::ReplaceTopics, "", |r, _| {
            r.topics = topics.to_vec();
            Ok(())
        })
        .await
    }

    async fn list_branches(&self, repo: &RepoIdentifier) -> Result<Vec<String>> {
        self.call(repo, Op::ListBranches, "", |r, _| Ok(r.branches.clone()))
            .await
    }

    async fn get_branch_protection(
        &self,
        repo: &RepoIdentifier,
        branch: &str,
    ) -> Result<Option<BranchProtectionRule>> {
        self.call(repo, Op::GetBranchProtection, branch, |r, path| {
            if !r.branches.iter().any(|b| b == branch) {
                return Err(not_found(
                    Op::GetBranchProtection,
                    format!("{path}/branches/{branch}/protection"),
                ));
            }
            Ok(r.protection.get(branch).cloned())
        })
        .await
    }

    async fn update_branch_protection(
        &self,
        repo: &RepoIdentifier,
        rule: &BranchProtectionRule,
    ) -> Result<()> {
        self.call(repo, Op::UpdateBranchProtection, &rule.pattern, |r, path| {
            if !r.branches.contains(&rule.pattern) {
                return Err(not_found(
                    Op::UpdateBranchProtection,
                    format!("{path}/branches/{}/protection", rule.pattern),
                ));
            }
            r.protection
                .insert(rule.pattern.clone(), rule.clone().normalized());
            Ok(())
        })
        .await
    }

    async fn list_labels(&self, repo: &RepoIdentifier) -> Result<Vec<Label>> {
        self.call(repo, Op::ListLabels, "", |r, _| Ok(r.labels.clone()))
            .await
    }

    async fn create_label(&self, repo: &RepoIdentifier, label: &Label) -> Result<()> {
        self.call(repo, Op::CreateLabel, &label.name, |r, path| {
            if r.find_label(&label.name).is_some() {
                return Err(validation(
                    Op::CreateLabel,
                    format!("{path}/labels"),
                    "Validation Failed: already_exists",
                ));
            }
            r.labels.push(Label {
                description: Some(label.description.clone().unwrap_or_default()),
                ..label.clone()
            });
            Ok(())
        })
        .await
    }

    async fn update_label(
        &self,
        repo: &RepoIdentifier,
        current_name: &str,
        label: &Label,
    ) -> Result<()> {
        self.call(repo, Op::UpdateLabel, current_name, |r, path| {
            let Some(index) = r.find_label(current_name) else {
                return Err(not_found(
                    Op::UpdateLabel,
                    format!("{path}/labels/{current_name}"),
                ));
            };
            let existing = &mut r.labels[index];
            existing.name = label.name.clone();
            existing.color = label.color.clone();
            if let Some(description) = &label.description {
                existing.description = Some(description.clone());
            }
            Ok(())
        })
        .await
    }

    async fn delete_label(&self, repo: &RepoIdentifier, name: &str) -> Result<()> {
        self.call(repo, Op::DeleteLabel, name, |r, path| {
            let Some(index) = r.find_label(name) else {
                return Err(not_found(Op::DeleteLabel, format!("{path}/labels/{name}")));
            };
            r.labels.remove(index);
            Ok(())
        })
        .await
    }

    async fn list_collaborators(&self, repo: &RepoIdentifier) -> Result<Vec<CollaboratorEntry>> {
        self.call(repo, Op::ListCollaborators, "", |r, _| {
            Ok(r.collaborators.clone())
        })
        .await
    }

    async fn list_invitations(&self, repo: &RepoIdentifier) -> Result<Vec<CollaboratorEntry>> {
        self.call(repo, Op::ListInvitations, "", |r, _| Ok(r.invitations.clone()))
            .await
    }

    async fn list_teams(&self, repo: &RepoIdentifier) -> Result<Vec<CollaboratorEntry>> {
        self.call(repo, Op::ListTeams, "", |r, _| Ok(r.teams.clone()))
            .await
    }

    async fn set_permission(&self, repo: &RepoIdentifier, entry: &CollaboratorEntry) -> Result<()> {
        let key = entry.principal.key();
        self.call(repo, Op::SetPermission, &key, |r, _| {
            let invited = r.invitations.iter().any(|e| e.principal == entry.principal);
            let list = match entry.principal {
                Principal::User(_) if invited => &mut r.invitations,
                Principal::User(_) => &mut r.collaborators,
                Principal::Team(_) => &mut r.teams,
            };
            match list.iter_mut().find(|e| e.principal == entry.principal) {
                Some(existing) => existing.permission = entry.permission,
                None => list.push(entry.clone()),
            }
            Ok(())
        })
        .await
    }

    async fn get_file_contents(
        &self,
        repo: &RepoIdentifier,
        path: &str,
        _git_ref: Option<&str>,
    ) -> Result<Option<String>> {
        self.call(repo, Op::GetFileContents, path, |r, _| {
            Ok(r.files.get(path).cloned())
        })
        .await
    }

    async fn find_open_issue(&self, repo: &RepoIdentifier, title: &str) -> Result<Option<u64>> {
        self.call(repo, Op::FindOpenIssue, title, |r, _| {
            Ok(r
                .issues
                .iter()
                .find(|i| i.open && i.title == title)
                .map(|i| i.number))
        })
        .await
    }

    async fn create_issue(&self, repo: &RepoIdentifier, title: &str, body: &str) -> Result<u64> {
        self.call(repo, Op::CreateIssue, title, |r, _| {
            let number = r.issues.len() as u64 + 1;
            r.issues.push(FakeIssue {
                number,
                title: title.to_string(),
                body: body.to_string(),
                open: true,
            });
            Ok(number)
        })
        .await
    }

    async fn update_issue(&self, repo: &RepoIdentifier, number: u64, body: &str) -> Result<()> {
        self.call(repo, Op::UpdateIssue, &number.to_string(), |r, path| {
            let Some(issue) = r.issues.iter_mut().find(|i| i.number == number) else {
                return Err(not_found(Op::UpdateIssue, format!("{path}/issues/{number}")));
            };
            issue.body = body.to_string();
            Ok(())
        })
        .await
    }

    async fn list_pull_request_files(&self, repo: &RepoIdentifier, number: u64) -> Result<Vec<String>> {
        self.call(repo, Op::ListPullRequestFiles, &number.to_string(), |r, path| {
            r.pull_requests
                .get(&number)
                .cloned()
                .ok_or_else(|| not_found(Op::ListPullRequestFiles, format!("{path}/pulls/{number}")))
        })
        .await
    }

    async fn create_check_run(&self, repo: &RepoIdentifier, run: &CheckRun) -> Result<()> {
        self.call(repo, Op::CreateCheckRun, &run.head_sha, |r, _| {
            r.check_runs.push(run.clone());
            Ok(())
        })
        .await
    }
}
