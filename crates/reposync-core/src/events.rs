//! Trigger events and what they mean for the engine
//!
//! The engine itself does not care why a pass runs. This module turns a
//! webhook (event kind plus JSON payload) into a [`Decision`]: sync a
//! repository, validate a proposed config, or do nothing.

use std::fmt;
use std::str::FromStr;

use reposync_meta::RepoIdentifier;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Errors interpreting a trigger event.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The payload carries no installation, so no client can be authenticated.
    #[error("Installation ID not provided in {event} event")]
    MissingInstallation { event: EventKind },

    #[error("Unsupported event kind '{kind}'")]
    Unsupported { kind: String },

    #[error("Malformed {event} payload: {message}")]
    Payload { event: EventKind, message: String },

    #[error(transparent)]
    Repository(#[from] reposync_meta::Error),
}

/// Webhook event kinds that can start a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Push,
    ScheduleRepository,
    RepositoryTransferred,
    PullRequest,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::ScheduleRepository => "schedule.repository",
            Self::RepositoryTransferred => "repository.transferred",
            Self::PullRequest => "pull_request",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    /// Accepts the `X-GitHub-Event` header value, optionally qualified with
    /// the action (`repository.transferred`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "push" => Ok(Self::Push),
            "schedule.repository" => Ok(Self::ScheduleRepository),
            "repository" | "repository.transferred" => Ok(Self::RepositoryTransferred),
            "pull_request" => Ok(Self::PullRequest),
            other => Err(EventError::Unsupported {
                kind: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Installation {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// Repository as it appears in webhook payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadRepository {
    pub name: String,
    pub owner: Owner,
    #[serde(default)]
    pub default_branch: Option<String>,
}

impl PayloadRepository {
    pub fn identifier(&self) -> Result<RepoIdentifier, EventError> {
        Ok(RepoIdentifier::new(&self.owner.login, &self.name)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushCommit {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
    pub repository: PayloadRepository,
    #[serde(default)]
    pub installation: Option<Installation>,
}

impl PushEvent {
    /// Whether any commit touched a path containing `file_name`.
    pub fn touches(&self, file_name: &str) -> bool {
        self.commits.iter().any(|c| {
            c.added
                .iter()
                .chain(&c.modified)
                .chain(&c.removed)
                .any(|path| path.contains(file_name))
        })
    }
}

/// Periodic sweep, delivered once per repository.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleEvent {
    pub cron_org: String,
    pub repository: PayloadRepository,
    #[serde(default)]
    pub installation: Option<Installation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryEvent {
    pub action: String,
    pub repository: PayloadRepository,
    #[serde(default)]
    pub installation: Option<Installation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub head: PullRequestHead,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequest,
    pub repository: PayloadRepository,
    #[serde(default)]
    pub installation: Option<Installation>,
}

/// A parsed trigger.
#[derive(Debug, Clone)]
pub enum TriggerEvent {
    Push(PushEvent),
    Schedule(ScheduleEvent),
    Repository(RepositoryEvent),
    PullRequest(PullRequestEvent),
}

/// What a trigger asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Sync {
        repo: RepoIdentifier,
        default_branch: Option<String>,
    },
    /// Check the config proposed at `head_sha` without applying it.
    Validate {
        repo: RepoIdentifier,
        pull_request: u64,
        head_sha: String,
    },
    Skip {
        reason: String,
    },
}

fn parse_payload<T: DeserializeOwned>(event: EventKind, payload: &str) -> Result<T, EventError> {
    serde_json::from_str(payload).map_err(|e| EventError::Payload {
        event,
        message: e.to_string(),
    })
}

fn skip(reason: String) -> Result<Decision, EventError> {
    info!(reason = %reason, "skipping event");
    Ok(Decision::Skip { reason })
}

impl TriggerEvent {
    pub fn parse(kind: &str, payload: &str) -> Result<Self, EventError> {
        let kind: EventKind = kind.parse()?;
        Ok(match kind {
            EventKind::Push => Self::Push(parse_payload(kind, payload)?),
            EventKind::ScheduleRepository => Self::Schedule(parse_payload(kind, payload)?),
            EventKind::RepositoryTransferred => Self::Repository(parse_payload(kind, payload)?),
            EventKind::PullRequest => Self::PullRequest(parse_payload(kind, payload)?),
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Push(_) => EventKind::Push,
            Self::Schedule(_) => EventKind::ScheduleRepository,
            Self::Repository(_) => EventKind::RepositoryTransferred,
            Self::PullRequest(_) => EventKind::PullRequest,
        }
    }

    pub fn installation_id(&self) -> Option<u64> {
        let installation = match self {
            Self::Push(e) => &e.installation,
            Self::Schedule(e) => &e.installation,
            Self::Repository(e) => &e.installation,
            Self::PullRequest(e) => &e.installation,
        };
        installation.as_ref().map(|i| i.id)
    }

    fn repository(&self) -> &PayloadRepository {
        match self {
            Self::Push(e) => &e.repository,
            Self::Schedule(e) => &e.repository,
            Self::Repository(e) => &e.repository,
            Self::PullRequest(e) => &e.repository,
        }
    }

    /// Decide what this event asks for.
    ///
    /// `config_file_name` is the bare file name of the desired-state file;
    /// a push only triggers a sync when one of its commits touched it.
    ///
    /// # Errors
    ///
    /// [`EventError::MissingInstallation`] when the payload has no
    /// installation, whatever the event.
    pub fn decide(&self, config_file_name: &str) -> Result<Decision, EventError> {
        if self.installation_id().is_none() {
            return Err(EventError::MissingInstallation { event: self.kind() });
        }
        let repo = self.repository().identifier()?;

        match self {
            Self::Push(push) => {
                let default_branch = push.repository.default_branch.clone();
                let expected = default_branch
                    .as_deref()
                    .map(|b| format!("refs/heads/{b}"));
                if expected.as_deref() != Some(push.git_ref.as_str()) {
                    return skip(format!("push to non-default branch {}", push.git_ref));
                }
                if !push.touches(config_file_name) {
                    debug!(commits = push.commits.len(), "push does not modify config");
                    return skip("push does not modify the config file".to_string());
                }
                Ok(Decision::Sync {
                    repo,
                    default_branch,
                })
            }
            Self::Schedule(schedule) => {
                if !schedule.cron_org.eq_ignore_ascii_case(repo.owner()) {
                    return skip(format!("scheduled run for {}", schedule.cron_org));
                }
                Ok(Decision::Sync {
                    repo,
                    default_branch: None,
                })
            }
            Self::Repository(event) => {
                if event.action != "transferred" {
                    return skip(format!("repository.{} is not handled", event.action));
                }
                Ok(Decision::Sync {
                    repo,
                    default_branch: event.repository.default_branch.clone(),
                })
            }
            Self::PullRequest(pr) => match pr.action.as_str() {
                "opened" | "reopened" | "synchronize" => Ok(Decision::Validate {
                    repo,
                    pull_request: pr.number,
                    head_sha: pr.pull_request.head.sha.clone(),
                }),
                other => skip(format!("pull_request.{other} is not handled")),
            },
        }
    }
}
