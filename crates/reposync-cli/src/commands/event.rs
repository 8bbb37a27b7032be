//! Handle-event command implementation

use std::path::Path;

use colored::Colorize;
use reposync_core::{EventHandler, HandlerOutcome, SyncEngine, TriggerEvent};

use super::Context;
use crate::error::{CliError, Result};

/// Run the event handler on a webhook payload stored on disk.
pub async fn run_handle_event(ctx: &Context, kind: &str, payload: &Path) -> Result<()> {
    let body = std::fs::read_to_string(payload)?;
    let event = TriggerEvent::parse(kind, &body).map_err(reposync_core::Error::from)?;

    let handler = EventHandler::new(
        SyncEngine::from_settings(&ctx.settings),
        ctx.settings.github.config_path.clone(),
    );
    let outcome = handler.handle(ctx.client.as_ref(), &event).await?;

    match outcome {
        HandlerOutcome::Skipped { reason } => {
            println!("{} {}", "SKIP".dimmed().bold(), reason);
            Ok(())
        }
        HandlerOutcome::Synced(report) => {
            println!("{} {}", "OK".green().bold(), report.summary());
            if report.is_success() {
                Ok(())
            } else {
                Err(CliError::user(format!("{} did not sync cleanly", report.repo)))
            }
        }
        HandlerOutcome::ConfigRejected { repo, issue, error } => {
            println!(
                "{} {}: {} (reported in issue #{})",
                "INVALID".red().bold(),
                repo,
                error,
                issue
            );
            Err(error.into())
        }
        HandlerOutcome::Validated {
            repo,
            pull_request,
            result,
        } => match result {
            Ok(()) => {
                println!(
                    "{} {}#{}: proposed config is valid",
                    "OK".green().bold(),
                    repo,
                    pull_request
                );
                Ok(())
            }
            Err(error) => {
                println!("{} {}#{}: {}", "INVALID".red().bold(), repo, pull_request, error);
                Err(error.into())
            }
        },
    }
}
