//! Plan command implementation

use std::path::Path;

use colored::Colorize;
use reposync_core::{ChangeAction, ChangePlan, SyncEngine};

use super::{Context, desired_config, parse_repo};
use crate::error::Result;

/// Dry run: print what a sync would change without applying it.
pub async fn run_plan(
    ctx: &Context,
    repo: &str,
    config: Option<&Path>,
    default_branch: Option<&str>,
    json: bool,
) -> Result<()> {
    let repo = parse_repo(repo)?;
    let Some(desired) = desired_config(ctx, &repo, config).await? else {
        if json {
            println!("{}", serde_json::to_string_pretty(&ChangePlan::default())?);
        } else {
            println!("{} {} has no config; nothing to sync.", "OK".green().bold(), repo);
        }
        return Ok(());
    };

    let engine = SyncEngine::from_settings(&ctx.settings);
    let plan = engine
        .plan(ctx.client.as_ref(), &repo, &desired, default_branch)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    print_plan(&repo.to_string(), &plan);
    Ok(())
}

pub fn print_plan(repo: &str, plan: &ChangePlan) {
    if plan.is_empty() {
        println!("{} {} is in sync. No changes needed.", "OK".green().bold(), repo);
    } else {
        println!("{} {} change(s) for {}:", "=>".blue().bold(), plan.len(), repo.cyan());
        for op in &plan.operations {
            let marker = match op.action {
                ChangeAction::Create => "+".green(),
                ChangeAction::Update => "~".yellow(),
                ChangeAction::Delete => "-".red(),
            };
            println!("   {} [{}] {}", marker, op.category.to_string().dimmed(), op.describe());
        }
    }
    for item in &plan.skipped {
        println!(
            "   {} [{}] {}: {}",
            "skip".yellow(),
            item.category.to_string().dimmed(),
            item.key,
            item.reason
        );
    }
}
