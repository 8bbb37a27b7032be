//! [`GitHubApi`] over the GitHub REST API

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reposync_meta::{
    BranchProtectionRule, CollaboratorEntry, GeneralSettings, Label, Principal, RepoIdentifier,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::wire::{
    ApiMessage, BranchResponse, CollaboratorResponse, ContentResponse, InvitationResponse,
    IssueRequest, IssueResponse, LabelRequest, LabelResponse, PermissionRequest,
    ProtectionResponse, PullRequestFileResponse, RepositoryResponse, TeamResponse, Topics,
    check_run_request, protection_request,
};
use crate::{CheckRun, Error, GitHubApi, RepositoryInfo, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
const TIMEOUT: Duration = Duration::from_secs(30);

/// Token-authenticated REST client.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestClient {
    /// Create a client for `api.github.com`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    /// Create a client for a GitHub Enterprise or mock server.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("reposync/0.1"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| Error::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        debug!(%method, path, "GitHub request");
        let mut request = self
            .client
            .request(method.clone(), format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, format!("Bearer {}", self.token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(path, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let quota_exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .map(|m| m.message)
            .unwrap_or(body);
        let rate_limited = status.as_u16() == 429
            || (status.as_u16() == 403
                && (quota_exhausted || message.to_lowercase().contains("rate limit")));

        Err(Error::Status {
            method: method.to_string(),
            path: path.to_string(),
            status: status.as_u16(),
            message,
            rate_limited,
            retry_after,
        })
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
        response.json().await.map_err(|e| Error::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        Self::decode(path, response).await
    }

    /// GET that maps 404 to `None`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.send::<()>(Method::GET, path, None).await {
            Ok(response) => Self::decode(path, response).await.map(Some),
            Err(e) if e.status_code() == Some(404) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Follow page-numbered pagination until a short page is returned.
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        for page in 1.. {
            let page_path = format!("{path}{separator}per_page={PER_PAGE}&page={page}");
            let batch: Vec<T> = self.get(&page_path).await?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }

    async fn write<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: &B) -> Result<()> {
        self.send(method, path, Some(body)).await.map(|_| ())
    }
}

fn repo_path(repo: &RepoIdentifier) -> String {
    format!(
        "/repos/{}/{}",
        urlencoding::encode(repo.owner()),
        urlencoding::encode(repo.name())
    )
}

/// Encode each segment of a file path, keeping the separators.
fn encode_file_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl GitHubApi for RestClient {
    async fn get_repository(&self, repo: &RepoIdentifier) -> Result<RepositoryInfo> {
        let response: RepositoryResponse = self.get(&repo_path(repo)).await?;
        Ok(response.into())
    }

    async fn update_repository(&self, repo: &RepoIdentifier, patch: &GeneralSettings) -> Result<()> {
        self.write(Method::PATCH, &repo_path(repo), patch).await
    }

    async fn get_topics(&self, repo: &RepoIdentifier) -> Result<Vec<String>> {
        let topics: Topics = self.get(&format!("{}/topics", repo_path(repo))).await?;
        Ok(topics.names)
    }

    async fn replace_topics(&self, repo: &RepoIdentifier, topics: &[String]) -> Result<()> {
        let body = Topics {
            names: topics.to_vec(),
        };
        self.write(Method::PUT, &format!("{}/topics", repo_path(repo)), &body)
            .await
    }

    async fn list_branches(&self, repo: &RepoIdentifier) -> Result<Vec<String>> {
        let branches: Vec<BranchResponse> =
            self.get_all(&format!("{}/branches", repo_path(repo))).await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn get_branch_protection(
        &self,
        repo: &RepoIdentifier,
        branch: &str,
    ) -> Result<Option<BranchProtectionRule>> {
        let path = format!(
            "{}/branches/{}/protection",
            repo_path(repo),
            urlencoding::encode(branch)
        );
        let response: Option<ProtectionResponse> = self.get_optional(&path).await?;
        Ok(response.map(|r| r.into_rule(branch)))
    }

    async fn update_branch_protection(
        &self,
        repo: &RepoIdentifier,
        rule: &BranchProtectionRule,
    ) -> Result<()> {
        let path = format!(
            "{}/branches/{}/protection",
            repo_path(repo),
            urlencoding::encode(&rule.pattern)
        );
        self.write(Method::PUT, &path, &protection_request(rule))
            .await
    }

    async fn list_labels(&self, repo: &RepoIdentifier) -> Result<Vec<Label>> {
        let labels: Vec<LabelResponse> =
            self.get_all(&format!("{}/labels", repo_path(repo))).await?;
        Ok(labels.into_iter().map(Label::from).collect())
    }

    async fn create_label(&self, repo: &RepoIdentifier, label: &Label) -> Result<()> {
        let body = LabelRequest {
            name: Some(&label.name),
            new_name: None,
            color: &label.color,
            description: label.description.as_deref(),
        };
        self.write(Method::POST, &format!("{}/labels", repo_path(repo)), &body)
            .await
    }

    async fn update_label(
        &self,
        repo: &RepoIdentifier,
        current_name: &str,
        label: &Label,
    ) -> Result<()> {
        let body = LabelRequest {
            name: None,
            new_name: (label.name != current_name).then_some(label.name.as_str()),
            color: &label.color,
            description: label.description.as_deref(),
        };
        let path = format!(
            "{}/labels/{}",
            repo_path(repo),
            urlencoding::encode(current_name)
        );
        self.write(Method::PATCH, &path, &body).await
    }

    async fn delete_label(&self, repo: &RepoIdentifier, name: &str) -> Result<()> {
        let path = format!("{}/labels/{}", repo_path(repo), urlencoding::encode(name));
        self.send::<()>(Method::DELETE, &path, None).await.map(|_| ())
    }

    async fn list_collaborators(&self, repo: &RepoIdentifier) -> Result<Vec<CollaboratorEntry>> {
        let users: Vec<CollaboratorResponse> = self
            .get_all(&format!("{}/collaborators?affiliation=direct", repo_path(repo)))
            .await?;
        Ok(users.into_iter().map(CollaboratorEntry::from).collect())
    }

    async fn list_invitations(&self, repo: &RepoIdentifier) -> Result<Vec<CollaboratorEntry>> {
        let invitations: Vec<InvitationResponse> = self
            .get_all(&format!("{}/invitations", repo_path(repo)))
            .await?;
        Ok(invitations
            .into_iter()
            .filter_map(InvitationResponse::into_entry)
            .collect())
    }

    async fn list_teams(&self, repo: &RepoIdentifier) -> Result<Vec<CollaboratorEntry>> {
        let teams: Vec<TeamResponse> =
            self.get_all(&format!("{}/teams", repo_path(repo))).await?;
        Ok(teams.into_iter().map(CollaboratorEntry::from).collect())
    }

    async fn set_permission(&self, repo: &RepoIdentifier, entry: &CollaboratorEntry) -> Result<()> {
        let body = PermissionRequest {
            permission: entry.permission.as_api_str(),
        };
        let path = match &entry.principal {
            Principal::User(login) => format!(
                "{}/collaborators/{}",
                repo_path(repo),
                urlencoding::encode(login)
            ),
            Principal::Team(slug) => format!(
                "/orgs/{}/teams/{}/repos/{}/{}",
                urlencoding::encode(repo.owner()),
                urlencoding::encode(slug),
                urlencoding::encode(repo.owner()),
                urlencoding::encode(repo.name())
            ),
        };
        self.write(Method::PUT, &path, &body).await
    }

    async fn get_file_contents(
        &self,
        repo: &RepoIdentifier,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Option<String>> {
        let mut request_path = format!("{}/contents/{}", repo_path(repo), encode_file_path(path));
        if let Some(git_ref) = git_ref {
            request_path.push_str(&format!("?ref={}", urlencoding::encode(git_ref)));
        }

        let Some(content) = self.get_optional::<ContentResponse>(&request_path).await? else {
            return Ok(None);
        };
        if content.encoding != "base64" {
            return Err(Error::Decode {
                path: request_path,
                message: format!("unsupported content encoding '{}'", content.encoding),
            });
        }

        let compact: String = content
            .content
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| Error::Decode {
                path: request_path.clone(),
                message: e.to_string(),
            })?;
        String::from_utf8(bytes).map(Some).map_err(|e| Error::Decode {
            path: request_path,
            message: e.to_string(),
        })
    }

    async fn find_open_issue(&self, repo: &RepoIdentifier, title: &str) -> Result<Option<u64>> {
        let issues: Vec<IssueResponse> = self
            .get_all(&format!("{}/issues?state=open", repo_path(repo)))
            .await?;
        Ok(issues
            .into_iter()
            .find(|i| i.pull_request.is_none() && i.title == title)
            .map(|i| i.number))
    }

    async fn create_issue(&self, repo: &RepoIdentifier, title: &str, body: &str) -> Result<u64> {
        let path = format!("{}/issues", repo_path(repo));
        let request = IssueRequest {
            title: Some(title),
            body,
        };
        let response = self.send(Method::POST, &path, Some(&request)).await?;
        let issue: IssueResponse = Self::decode(&path, response).await?;
        Ok(issue.number)
    }

    async fn update_issue(&self, repo: &RepoIdentifier, number: u64, body: &str) -> Result<()> {
        let request = IssueRequest { title: None, body };
        self.write(
            Method::PATCH,
            &format!("{}/issues/{number}", repo_path(repo)),
            &request,
        )
        .await
    }

    async fn list_pull_request_files(&self, repo: &RepoIdentifier, number: u64) -> Result<Vec<String>> {
        let files: Vec<PullRequestFileResponse> = self
            .get_all(&format!("{}/pulls/{number}/files", repo_path(repo)))
            .await?;
        Ok(files
            .into_iter()
            .flat_map(|f| std::iter::once(f.filename).chain(f.previous_filename))
            .collect())
    }

    async fn create_check_run(&self, repo: &RepoIdentifier, run: &CheckRun) -> Result<()> {
        self.write(
            Method::POST,
            &format!("{}/check-runs", repo_path(repo)),
            &check_run_request(run),
        )
        .await
    }
}
