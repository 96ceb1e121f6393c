//! Sessions command - list and filter conversations.
//!
//! Displays stored conversations, most recently updated first. Records
//! that cannot be read are skipped and reported after the listing.

use anyhow::Result;
use colored::Colorize;

use bocode_cli::config::Config;

use crate::cli::format::{print_json, short_timestamp};
use crate::cli::{open_store, short_id, truncate_chars, OutputFormat};

/// Arguments for the sessions command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode sessions                  List recent conversations (default 20)\n    \
    bocode sessions --limit 50       Show up to 50 conversations\n    \
    bocode sessions --tag rust       Filter to conversations tagged 'rust'\n    \
    bocode sessions --format json    Output as JSON")]
pub struct Args {
    /// Filter to conversations with this tag
    #[arg(short, long, value_name = "LABEL")]
    pub tag: Option<String>,

    /// Maximum number of conversations to display
    #[arg(short, long, default_value = "20", value_name = "N")]
    pub limit: usize,

    /// Output format: text (default), json
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Executes the sessions command.
pub fn run(args: Args, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let listing = store.list()?;

    let conversations: Vec<_> = listing
        .iter()
        .filter(|c| args.tag.as_ref().is_none_or(|tag| c.tags.contains(tag)))
        .take(args.limit)
        .collect();

    if args.format.is_json() {
        return print_json(&conversations);
    }

    if conversations.is_empty() {
        println!("{}", "No conversations found.".dimmed());
        println!();
        println!("Run 'bocode new \"your question\"' to start one.");
    } else {
        const ID_WIDTH: usize = 10;
        const UPDATED_WIDTH: usize = 16;
        const MESSAGES_WIDTH: usize = 8;
        const TAGS_WIDTH: usize = 20;
        const TITLE_WIDTH: usize = 50;

        println!(
            "{}",
            format!(
                "{:<ID_WIDTH$}  {:<UPDATED_WIDTH$}  {:>MESSAGES_WIDTH$}  {:<TAGS_WIDTH$}  {}",
                "ID", "UPDATED", "MESSAGES", "TAGS", "TITLE"
            )
            .bold()
        );

        for conversation in &conversations {
            let updated = short_timestamp(&conversation.updated_at);
            let tags = if conversation.tags.is_empty() {
                "-".to_string()
            } else {
                conversation
                    .tags
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            };

            println!(
                "{:<ID_WIDTH$}  {:<UPDATED_WIDTH$}  {:>MESSAGES_WIDTH$}  {:<TAGS_WIDTH$}  {}",
                short_id(&conversation.id).cyan(),
                updated.dimmed(),
                conversation.message_count,
                truncate_chars(&tags, TAGS_WIDTH).yellow(),
                truncate_chars(&conversation.title, TITLE_WIDTH)
            );
        }
    }

    if !listing.skipped.is_empty() {
        println!();
        println!(
            "{}",
            format!("Skipped {} unreadable record(s):", listing.skipped.len()).yellow()
        );
        for skipped in &listing.skipped {
            println!("  {}  {}", skipped.path.display(), skipped.reason.dimmed());
        }
    }

    Ok(())
}
