//! Delete command - permanently remove a conversation record.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use colored::Colorize;

use bocode_cli::config::Config;

use crate::cli::format::timestamp;
use crate::cli::{open_store, short_id};

/// Arguments for the delete command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode delete abc123             Asks before deleting\n    \
    bocode delete last --force       Deletes the latest conversation right away")]
pub struct Args {
    /// Conversation ID prefix, or 'last'
    #[arg(value_name = "CONVERSATION")]
    pub conversation: String,

    /// Delete without asking
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: Args, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let id = store.resolve(&args.conversation)?;
    let summary = store.load(&id)?.summary();

    if !args.force {
        println!("{}  {}", short_id(&id).cyan(), summary.title);
        println!(
            "  {} messages, last updated {}",
            summary.message_count,
            timestamp(&summary.updated_at)
        );
        if !confirm(&mut io::stdin().lock(), "Delete this conversation permanently?")? {
            println!("{}", "Kept.".dimmed());
            return Ok(());
        }
    }

    store.delete(&id)?;
    println!("{} {}", "Deleted".green(), short_id(&id).cyan());
    Ok(())
}

/// Asks a yes/no question; anything but `y` or `yes` means no.
fn confirm(input: &mut impl BufRead, question: &str) -> io::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_answers() {
        assert!(confirm(&mut "y\n".as_bytes(), "?").unwrap());
        assert!(confirm(&mut "YES\n".as_bytes(), "?").unwrap());
        assert!(!confirm(&mut "\n".as_bytes(), "?").unwrap());
        assert!(!confirm(&mut "nope\n".as_bytes(), "?").unwrap());
    }
}
