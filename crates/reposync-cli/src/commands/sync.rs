//! Sync command implementation
//!
//! Reconciles every requested repository in parallel and prints one report
//! per repository. A repository whose config cannot be loaded is reported
//! as failed without holding up the others.

use std::path::Path;

use colored::Colorize;
use reposync_core::{PassOutcome, ReconciliationReport, SyncEngine, SyncJob};
use reposync_meta::{RepoIdentifier, load_config_file};
use serde_json::json;
use tracing::warn;

use super::{Context, desired_config, parse_repo};
use crate::error::{CliError, Result};

/// Where a requested repository stands before the passes run.
enum Slot {
    /// Handed to the engine; its result comes back in job order.
    Queued,
    /// Its config could not be loaded, so no pass runs for it.
    Rejected(RepoIdentifier, CliError),
}

pub async fn run_sync(
    ctx: &Context,
    repos: &[String],
    config: Option<&Path>,
    default_branch: Option<&str>,
    json: bool,
) -> Result<()> {
    let repos = repos
        .iter()
        .map(|value| parse_repo(value))
        .collect::<Result<Vec<_>>>()?;

    // a local file is read once and applied to every repository
    let shared = match config {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };

    let mut slots = Vec::with_capacity(repos.len());
    let mut jobs = Vec::with_capacity(repos.len());
    for repo in repos {
        let config = match &shared {
            Some(config) => config.clone(),
            None => match desired_config(ctx, &repo, None).await {
                Ok(config) => config,
                Err(e) => {
                    warn!(repo = %repo, error = %e, "could not load config, skipping repository");
                    slots.push(Slot::Rejected(repo, e));
                    continue;
                }
            },
        };
        slots.push(Slot::Queued);
        jobs.push(SyncJob {
            repo,
            config,
            default_branch: default_branch.map(str::to_string),
        });
    }

    if !json {
        println!(
            "{} Synchronizing {} repositor{}...",
            "=>".blue().bold(),
            slots.len(),
            if slots.len() == 1 { "y" } else { "ies" }
        );
    }

    let engine = SyncEngine::from_settings(&ctx.settings);
    let mut results = engine
        .reconcile_many(ctx.client.clone(), jobs)
        .await
        .into_iter();

    let total = slots.len();
    let mut failed = 0;
    let mut output = Vec::new();
    for slot in slots {
        let (repo, error) = match slot {
            Slot::Rejected(repo, e) => (repo, e.to_string()),
            Slot::Queued => match results.next() {
                Some((_, Ok(report))) => {
                    if !report.is_success() {
                        failed += 1;
                    }
                    if json {
                        output.push(serde_json::to_value(&report)?);
                    } else {
                        print_report(&report);
                    }
                    continue;
                }
                Some((repo, Err(e))) => (repo, e.to_string()),
                None => continue,
            },
        };
        failed += 1;
        if json {
            output.push(json!({"repo": repo.to_string(), "error": error}));
        } else {
            println!("{} {}: {}", "FAILED".red().bold(), repo, error);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    if failed > 0 {
        return Err(CliError::user(format!(
            "{failed} of {total} repositories did not sync cleanly"
        )));
    }
    Ok(())
}

fn print_report(report: &ReconciliationReport) {
    let status = match report.outcome {
        PassOutcome::Completed if report.is_success() => "OK".green().bold(),
        PassOutcome::Completed => "PARTIAL".yellow().bold(),
        PassOutcome::NoConfig | PassOutcome::Archived => "SKIP".dimmed().bold(),
    };
    println!("{} {}", status, report.summary());
    for (category, failure) in report.failures() {
        println!(
            "   {} [{}] {} {}: {} ({})",
            "!".red(),
            category.to_string().dimmed(),
            failure.action,
            failure.key,
            failure.message,
            failure.class
        );
    }
    for item in &report.skipped {
        println!(
            "   {} [{}] {}: {}",
            "skip".yellow(),
            item.category.to_string().dimmed(),
            item.key,
            item.reason
        );
    }
}
