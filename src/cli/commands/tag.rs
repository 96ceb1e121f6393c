//! Tag command - label conversations.

use anyhow::Result;
use colored::Colorize;

use bocode_cli::config::Config;

use crate::cli::{open_store, short_id};

#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode tag last rust              Label the latest conversation\n    \
    bocode tag abc123 a b c           Add several labels at once\n    \
    bocode tag abc123 wip --remove    Drop a label")]
pub struct Args {
    /// Conversation ID prefix, or 'last'
    #[arg(value_name = "CONVERSATION")]
    pub conversation: String,

    /// Labels to add or remove
    #[arg(value_name = "LABEL", required = true)]
    pub labels: Vec<String>,

    /// Remove the labels instead of adding them
    #[arg(long, short)]
    pub remove: bool,
}

pub fn run(args: Args, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let id = store.resolve(&args.conversation)?;
    let short = short_id(&id);

    for label in &args.labels {
        // Both calls are no-ops when there is nothing to change.
        let changed = if args.remove {
            store.untag(&id, label)?
        } else {
            store.tag(&id, label)?
        };

        let status = match (args.remove, changed) {
            (false, true) => "added".green(),
            (true, true) => "removed".green(),
            (false, false) => "already present".dimmed(),
            (true, false) => "not present".dimmed(),
        };
        println!("{}  {}  {}", short.cyan(), label.yellow(), status);
    }

    Ok(())
}
