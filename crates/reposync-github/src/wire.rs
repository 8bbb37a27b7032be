//! REST request and response bodies

use reposync_meta::{BranchProtectionRule, CollaboratorEntry, GeneralSettings, Label, Permission};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{CheckRun, RepositoryInfo};

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryResponse {
    description: Option<String>,
    homepage: Option<String>,
    #[serde(default)]
    has_issues: bool,
    #[serde(default)]
    has_wiki: bool,
    #[serde(default)]
    has_projects: bool,
    allow_squash_merge: Option<bool>,
    allow_merge_commit: Option<bool>,
    allow_rebase_merge: Option<bool>,
    allow_auto_merge: Option<bool>,
    delete_branch_on_merge: Option<bool>,
    default_branch: String,
    #[serde(default)]
    archived: bool,
}

impl From<RepositoryResponse> for RepositoryInfo {
    fn from(r: RepositoryResponse) -> Self {
        // GitHub omits the merge flags for tokens without admin rights; these
        // defaults match a freshly created repository.
        let settings = GeneralSettings {
            description: Some(r.description.unwrap_or_default()),
            homepage: Some(r.homepage.unwrap_or_default()),
            has_issues: Some(r.has_issues),
            has_wiki: Some(r.has_wiki),
            has_projects: Some(r.has_projects),
            allow_squash_merge: Some(r.allow_squash_merge.unwrap_or(true)),
            allow_merge_commit: Some(r.allow_merge_commit.unwrap_or(true)),
            allow_rebase_merge: Some(r.allow_rebase_merge.unwrap_or(true)),
            allow_auto_merge: Some(r.allow_auto_merge.unwrap_or(false)),
            delete_branch_on_merge: Some(r.delete_branch_on_merge.unwrap_or(false)),
            default_branch: Some(r.default_branch.clone()),
        };
        Self {
            settings,
            default_branch: r.default_branch,
            archived: r.archived,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Topics {
    pub names: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchResponse {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct Enabled {
    #[serde(default)]
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct StatusChecks {
    #[serde(default)]
    strict: bool,
    #[serde(default)]
    contexts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Reviews {
    #[serde(default)]
    dismiss_stale_reviews: bool,
    #[serde(default)]
    require_code_owner_reviews: bool,
    #[serde(default)]
    required_approving_review_count: u8,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProtectionResponse {
    required_status_checks: Option<StatusChecks>,
    enforce_admins: Option<Enabled>,
    required_pull_request_reviews: Option<Reviews>,
    required_linear_history: Option<Enabled>,
    allow_force_pushes: Option<Enabled>,
    allow_deletions: Option<Enabled>,
}

fn enabled(flag: &Option<Enabled>) -> bool {
    flag.as_ref().is_some_and(|f| f.enabled)
}

impl ProtectionResponse {
    pub fn into_rule(self, branch: &str) -> BranchProtectionRule {
        let mut rule = BranchProtectionRule::new(branch);
        if let Some(checks) = &self.required_status_checks {
            rule.strict_status_checks = checks.strict;
            rule.status_check_contexts = checks.contexts.clone();
        }
        if let Some(reviews) = &self.required_pull_request_reviews {
            rule.required_approving_review_count = reviews.required_approving_review_count;
            rule.requires_code_owner_reviews = reviews.require_code_owner_reviews;
            rule.dismisses_stale_reviews = reviews.dismiss_stale_reviews;
        }
        rule.is_admin_enforced = enabled(&self.enforce_admins);
        rule.requires_linear_history = enabled(&self.required_linear_history);
        rule.allows_force_pushes = enabled(&self.allow_force_pushes);
        rule.allows_deletions = enabled(&self.allow_deletions);
        rule.normalized()
    }
}

/// Body for `PUT /repos/{owner}/{repo}/branches/{branch}/protection`.
///
/// The endpoint requires every top-level key; unset sections are sent as null.
pub(crate) fn protection_request(rule: &BranchProtectionRule) -> Value {
    let checks = if rule.requires_status_checks() {
        json!({
            "strict": rule.strict_status_checks,
            "contexts": rule.status_check_contexts,
        })
    } else {
        Value::Null
    };
    let reviews = if rule.requires_reviews() {
        json!({
            "dismiss_stale_reviews": rule.dismisses_stale_reviews,
            "require_code_owner_reviews": rule.requires_code_owner_reviews,
            "required_approving_review_count": rule.required_approving_review_count,
        })
    } else {
        Value::Null
    };
    json!({
        "required_status_checks": checks,
        "enforce_admins": rule.is_admin_enforced,
        "required_pull_request_reviews": reviews,
        "restrictions": Value::Null,
        "required_linear_history": rule.requires_linear_history,
        "allow_force_pushes": rule.allows_force_pushes,
        "allow_deletions": rule.allows_deletions,
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelResponse {
    name: String,
    color: String,
    description: Option<String>,
}

impl From<LabelResponse> for Label {
    fn from(l: LabelResponse) -> Self {
        Self {
            name: l.name,
            color: l.color.to_lowercase(),
            description: Some(l.description.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LabelRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_name: Option<&'a str>,
    pub color: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct RepoPermissions {
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    maintain: bool,
    #[serde(default)]
    push: bool,
    #[serde(default)]
    triage: bool,
}

impl RepoPermissions {
    fn highest(&self) -> Permission {
        if self.admin {
            Permission::Admin
        } else if self.maintain {
            Permission::Maintain
        } else if self.push {
            Permission::Write
        } else if self.triage {
            Permission::Triage
        } else {
            Permission::Read
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollaboratorResponse {
    login: String,
    role_name: Option<String>,
    #[serde(default)]
    permissions: RepoPermissions,
}

impl From<CollaboratorResponse> for CollaboratorEntry {
    fn from(c: CollaboratorResponse) -> Self {
        // Custom repository roles have names outside the built-in set; fall
        // back to the base permission flags for those.
        let permission = c
            .role_name
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or_else(|| c.permissions.highest());
        CollaboratorEntry::user(&c.login, permission)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeamResponse {
    slug: String,
    permission: String,
    #[serde(default)]
    permissions: RepoPermissions,
}

impl From<TeamResponse> for CollaboratorEntry {
    fn from(t: TeamResponse) -> Self {
        let permission = t
            .permission
            .parse()
            .unwrap_or_else(|_| t.permissions.highest());
        CollaboratorEntry::team(&t.slug, permission)
    }
}

#[derive(Debug, Deserialize)]
struct Invitee {
    login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvitationResponse {
    /// `None` for invitations sent to an email address.
    invitee: Option<Invitee>,
    permissions: String,
}

impl InvitationResponse {
    pub fn into_entry(self) -> Option<CollaboratorEntry> {
        let invitee = self.invitee?;
        let permission = self.permissions.parse().ok()?;
        Some(CollaboratorEntry::user(&invitee.login, permission))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PermissionRequest {
    pub permission: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentResponse {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueResponse {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub pull_request: Option<Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IssueRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    pub body: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullRequestFileResponse {
    pub filename: String,
    pub previous_filename: Option<String>,
}

/// Body for `POST /repos/{owner}/{repo}/check-runs`.
pub(crate) fn check_run_request(run: &CheckRun) -> Value {
    json!({
        "name": run.name,
        "head_sha": run.head_sha,
        "status": "completed",
        "conclusion": run.conclusion.as_str(),
        "output": {
            "title": run.title,
            "summary": run.summary,
        },
    })
}
