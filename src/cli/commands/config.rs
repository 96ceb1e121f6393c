//! Config command - manage configuration

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use bocode_cli::config::{Config, KEYS};

#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode config                              Show all settings\n    \
    bocode config get log_count                Print one setting\n    \
    bocode config set retrospective_days 7     Change a setting\n    \
    bocode config set model \"\"                 Clear an optional setting")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Print the configuration file path
    Path,
}

pub fn run(args: Args, config: &mut Config) -> Result<()> {
    match args.command {
        Some(ConfigCommand::Show) | None => show_config(config),
        Some(ConfigCommand::Get { key }) => {
            println!("{}", config.get(&key)?);
            Ok(())
        }
        Some(ConfigCommand::Set { key, value }) => {
            config.set(&key, &value)?;
            config.save_to(&Config::config_path()?)?;
            tracing::debug!("Config key {key} updated");
            println!("{} {} = {}", "Set".green(), key.cyan(), value);
            Ok(())
        }
        Some(ConfigCommand::Path) => {
            println!("{}", Config::config_path()?.display());
            Ok(())
        }
    }
}

fn show_config(config: &Config) -> Result<()> {
    println!("{}", "bocode Configuration".bold());
    println!();
    println!(
        "  {}  {}",
        "File:".dimmed(),
        Config::config_path()?.display()
    );
    println!("  {}  {}", "Data:".dimmed(), config.data_dir()?.display());
    println!();

    let width = KEYS.iter().map(|k| k.len()).max().unwrap_or(0);
    for key in KEYS {
        let value = config.get(key)?;
        let shown = if value.is_empty() {
            "(unset)".dimmed().to_string()
        } else {
            value
        };
        println!("  {:<width$}  {}", key.cyan(), shown);
    }

    Ok(())
}
