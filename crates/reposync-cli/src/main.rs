//! reposync CLI
//!
//! Validate, preview and apply repository settings declared in
//! `sync-repo-settings.yaml`.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
    tracing::debug!("Verbose mode enabled");
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command.clone() else {
        println!("{} Repository settings sync", "reposync".green().bold());
        println!();
        println!("Run {} for available commands.", "reposync --help".cyan());
        return Ok(());
    };

    if let Commands::Validate { file } = &command {
        return commands::run_validate(file);
    }

    let ctx = Context::from_cli(&cli)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(execute_command(&ctx, command))
}

async fn execute_command(ctx: &Context, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Validate { file } => commands::run_validate(&file),
        Commands::Plan {
            repo,
            config,
            default_branch,
            json,
        } => commands::run_plan(ctx, &repo, config.as_deref(), default_branch.as_deref(), json).await,
        Commands::Sync {
            repos,
            config,
            default_branch,
            json,
        } => commands::run_sync(ctx, &repos, config.as_deref(), default_branch.as_deref(), json).await,
        Commands::HandleEvent { event, payload } => {
            commands::run_handle_event(ctx, &event, &payload).await
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_cli_error_user() {
        let error = crate::error::CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }
}
