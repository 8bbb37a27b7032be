//! GitHub API access for reposync
//!
//! The reconciliation engine never talks HTTP directly. It receives an
//! already-authenticated handle implementing [`GitHubApi`] and calls a fixed
//! set of read and write operations on it. This crate provides:
//!
//! - [`GitHubApi`] - the operations the engine needs
//! - [`RestClient`] - an implementation over the GitHub REST API
//! - [`Error`] / [`ErrorClass`] - failures classified into transient and permanent

pub mod api;
pub mod error;
pub mod rest;
mod wire;

pub use api::{CheckConclusion, CheckRun, GitHubApi, RepositoryInfo};
pub use error::{Error, ErrorClass, Result};
pub use rest::{DEFAULT_API_URL, RestClient};
