//! The GitHub operations the reconciliation engine depends on

use async_trait::async_trait;
use reposync_meta::{
    BranchProtectionRule, CollaboratorEntry, GeneralSettings, Label, RepoIdentifier,
};

use crate::Result;

/// Repository metadata read at the start of every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    /// Every field populated; missing strings are read as empty.
    pub settings: GeneralSettings,
    pub default_branch: String,
    pub archived: bool,
}

/// Final state of a completed check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckConclusion {
    Success,
    Failure,
}

impl CheckConclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// A completed check run attached to a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRun {
    pub name: String,
    pub head_sha: String,
    pub conclusion: CheckConclusion,
    pub title: String,
    /// Markdown shown on the check's details page.
    pub summary: String,
}

/// An authenticated handle to the GitHub API.
///
/// Implementations own authentication, transport timeouts and pagination.
/// Callers own retries.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn get_repository(&self, repo: &RepoIdentifier) -> Result<RepositoryInfo>;

    /// Apply the fields set in `patch` in a single request.
    async fn update_repository(&self, repo: &RepoIdentifier, patch: &GeneralSettings) -> Result<()>;

    async fn get_topics(&self, repo: &RepoIdentifier) -> Result<Vec<String>>;

    async fn replace_topics(&self, repo: &RepoIdentifier, topics: &[String]) -> Result<()>;

    async fn list_branches(&self, repo: &RepoIdentifier) -> Result<Vec<String>>;

    /// `Ok(None)` when the branch is not protected.
    async fn get_branch_protection(
        &self,
        repo: &RepoIdentifier,
        branch: &str,
    ) -> Result<Option<BranchProtectionRule>>;

    /// Create or replace protection for `rule.pattern`.
    async fn update_branch_protection(
        &self,
        repo: &RepoIdentifier,
        rule: &BranchProtectionRule,
    ) -> Result<()>;

    async fn list_labels(&self, repo: &RepoIdentifier) -> Result<Vec<Label>>;

    async fn create_label(&self, repo: &RepoIdentifier, label: &Label) -> Result<()>;

    /// Update the label currently named `current_name`; renames it when
    /// `label.name` differs.
    async fn update_label(
        &self,
        repo: &RepoIdentifier,
        current_name: &str,
        label: &Label,
    ) -> Result<()>;

    async fn delete_label(&self, repo: &RepoIdentifier, name: &str) -> Result<()>;

    /// Direct user collaborators.
    async fn list_collaborators(&self, repo: &RepoIdentifier) -> Result<Vec<CollaboratorEntry>>;

    /// Users invited as collaborators who have not accepted yet.
    async fn list_invitations(&self, repo: &RepoIdentifier) -> Result<Vec<CollaboratorEntry>>;

    /// Teams with access to the repository.
    async fn list_teams(&self, repo: &RepoIdentifier) -> Result<Vec<CollaboratorEntry>>;

    /// Grant or change a user's or team's permission.
    async fn set_permission(&self, repo: &RepoIdentifier, entry: &CollaboratorEntry) -> Result<()>;

    /// Contents of a file as UTF-8 text; `Ok(None)` when it does not exist.
    async fn get_file_contents(
        &self,
        repo: &RepoIdentifier,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Option<String>>;

    /// Number of an open issue with exactly this title.
    async fn find_open_issue(&self, repo: &RepoIdentifier, title: &str) -> Result<Option<u64>>;

    async fn create_issue(&self, repo: &RepoIdentifier, title: &str, body: &str) -> Result<u64>;

    async fn update_issue(&self, repo: &RepoIdentifier, number: u64, body: &str) -> Result<()>;

    /// Paths of the files a pull request adds, modifies or removes.
    async fn list_pull_request_files(&self, repo: &RepoIdentifier, number: u64) -> Result<Vec<String>>;

    async fn create_check_run(&self, repo: &RepoIdentifier, run: &CheckRun) -> Result<()>;
}
