//! Export command - render a conversation to markdown or JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};

use bocode_cli::config::Config;
use bocode_cli::storage::atomic::write_atomic;
use bocode_cli::storage::Redactor;

use crate::cli::open_store;

#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode export last                           Markdown to stdout\n    \
    bocode export abc123 -f json -o chat.json    JSON to a file\n    \
    bocode export abc123 --redact                Mask secrets and emails\n    \
    bocode export abc123 --redact-pattern 'ACME-\\d+'")]
pub struct Args {
    /// Conversation ID prefix, or 'last'
    #[arg(value_name = "CONVERSATION")]
    pub conversation: String,

    #[arg(short, long, value_enum, default_value = "markdown")]
    pub format: ExportFormat,

    /// Mask built-in secret patterns in message content
    #[arg(long)]
    #[arg(long_help = "Replace likely secrets in message content with [REDACTED]:\n\
        API keys, bearer and GitHub tokens, AWS access keys, passwords,\n\
        email addresses, private keys and database connection strings.")]
    pub redact: bool,

    /// Extra regex to mask (repeatable, works without --redact)
    #[arg(long = "redact-pattern", value_name = "REGEX")]
    pub redact_patterns: Vec<String>,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Markdown,
    Json,
}

pub fn run(args: Args, config: &Config) -> Result<()> {
    let redactor = Redactor::new(args.redact, &args.redact_patterns)?;
    let store = open_store(config)?;
    let id = store.resolve(&args.conversation)?;

    let rendered = match args.format {
        ExportFormat::Markdown => store.export_markdown(&id, &redactor)?,
        ExportFormat::Json => store.export_json(&id, &redactor)?,
    };

    match args.output {
        Some(path) => {
            write_atomic(&path, rendered.as_bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
