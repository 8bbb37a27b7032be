//! Shared test utilities for the reposync workspace.
//!
//! A dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fake`] - [`FakeGitHub`], an in-memory [`GitHubApi`](reposync_github::GitHubApi)
//!   with failure injection and call recording
//! - [`fixtures`] - identifiers, configs and repository states used across suites

pub mod fake;
pub mod fixtures;

pub use fake::{Call, FakeGitHub, FakeIssue, FakeRepo, Op};
