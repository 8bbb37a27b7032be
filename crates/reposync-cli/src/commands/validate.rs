//! Validate command implementation

use std::path::Path;

use colored::Colorize;
use reposync_meta::{ConfigError, load_config_file};

use crate::error::{CliError, Result};

/// Parse and validate a local config file.
///
/// Every schema issue is printed before the command fails.
pub fn run_validate(path: &Path) -> Result<()> {
    println!(
        "{} Validating {}...",
        "=>".blue().bold(),
        path.display().to_string().cyan()
    );

    match load_config_file(path) {
        Ok(Some(config)) => {
            let categories: Vec<String> = config
                .managed_categories()
                .iter()
                .map(|c| c.to_string())
                .collect();
            println!("{} Config is valid.", "OK".green().bold());
            if categories.is_empty() {
                println!("   No categories are managed.");
            } else {
                println!("   Manages: {}", categories.join(", "));
            }
            Ok(())
        }
        Ok(None) => {
            if path.exists() {
                println!("{} Config is empty; nothing would be synced.", "OK".green().bold());
                Ok(())
            } else {
                Err(CliError::user(format!("{} does not exist", path.display())))
            }
        }
        Err(reposync_meta::Error::Config(error)) => {
            match &error {
                ConfigError::Syntax { message, .. } => {
                    println!("{} Not valid YAML:", "INVALID".red().bold());
                    println!("   {} {}", "!".red(), message);
                }
                ConfigError::Schema { issues, .. } => {
                    println!("{} Schema violations:", "INVALID".red().bold());
                    for issue in issues {
                        println!("   {} {}", "!".red(), issue);
                    }
                }
            }
            Err(error.into())
        }
        Err(e) => Err(e.into()),
    }
}
