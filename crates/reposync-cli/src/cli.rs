//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// reposync - Keep GitHub repository settings in line with sync-repo-settings.yaml
#[derive(Parser, Debug)]
#[command(name = "reposync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine settings file (defaults to <config dir>/reposync/settings.toml)
    #[arg(long, global = true, env = "REPOSYNC_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// GitHub token used for API calls
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API base URL, overriding the settings file
    #[arg(long, global = true, env = "REPOSYNC_API_URL")]
    pub api_url: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Validate a local sync-repo-settings.yaml
    ///
    /// Exits non-zero when the file is invalid.
    Validate {
        /// Path to the config file
        file: PathBuf,
    },

    /// Preview the changes a sync would make
    Plan {
        /// Repository as owner/repo
        #[arg(short, long)]
        repo: String,

        /// Local config file to use instead of the one in the repository
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Treat this branch as the default branch
        #[arg(long)]
        default_branch: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Reconcile one or more repositories
    ///
    /// Examples:
    ///   reposync sync -r acme/widgets
    ///   reposync sync -r acme/widgets -r acme/gadgets --json
    ///   reposync sync -r acme/widgets -c ./sync-repo-settings.yaml
    Sync {
        /// Repositories as owner/repo
        #[arg(short, long = "repo", required = true)]
        repos: Vec<String>,

        /// Local config file applied to every repository
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Treat this branch as the default branch
        #[arg(long)]
        default_branch: Option<String>,

        /// Output reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Handle a stored webhook payload
    HandleEvent {
        /// Event kind, e.g. push or schedule.repository
        #[arg(short, long)]
        event: String,

        /// Path to the JSON payload
        #[arg(short, long)]
        payload: PathBuf,
    },
}
