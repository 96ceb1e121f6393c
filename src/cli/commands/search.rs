//! Search command - find conversations by content or tag.

use anyhow::Result;
use colored::Colorize;

use bocode_cli::config::Config;
use bocode_cli::storage::store::MatchLocation;

use crate::cli::format::{print_json, short_timestamp};
use crate::cli::{open_store, short_id, OutputFormat};

/// Arguments for the search command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode search lifetime              Find conversations mentioning 'lifetime'\n    \
    bocode search \"error handling\"      Search for a phrase\n    \
    bocode search rust --format json    Output hits as JSON")]
pub struct Args {
    /// Text to search for (case-insensitive)
    pub query: String,

    /// Limit results
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Output format: text (default), json
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Executes the search command.
pub fn run(args: Args, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let results = store.search(&args.query)?;
    let hits: Vec<_> = results.hits.iter().take(args.limit).collect();

    if args.format.is_json() {
        return print_json(&hits);
    }

    if hits.is_empty() {
        println!(
            "{}",
            format!("No conversations match '{}'.", args.query).dimmed()
        );
    }

    for hit in &hits {
        let location = match &hit.location {
            MatchLocation::Message { index, role } => format!("message {} ({role})", index + 1),
            MatchLocation::Tag { tag } => format!("tag '{tag}'"),
        };
        println!(
            "{}  {}  {}",
            short_id(&hit.id).cyan(),
            short_timestamp(&hit.updated_at).dimmed(),
            format!("{} match(es), first in {location}", hit.match_count).yellow()
        );
        println!("    {}", hit.excerpt);
    }

    if results.hits.len() > hits.len() {
        println!();
        println!(
            "{}",
            format!(
                "Showing {} of {} results. Use --limit to see more.",
                hits.len(),
                results.hits.len()
            )
            .dimmed()
        );
    }

    if !results.skipped.is_empty() {
        eprintln!(
            "{}",
            format!("Skipped {} unreadable record(s).", results.skipped.len()).yellow()
        );
    }

    Ok(())
}
