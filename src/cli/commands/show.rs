//! Show command - display a conversation.
//!
//! Prints every message in conversational order as colored text, JSON or
//! markdown.

use anyhow::Result;
use colored::Colorize;

use bocode_cli::config::Config;
use bocode_cli::storage::export::to_markdown;
use bocode_cli::storage::{Conversation, MessageRole, Redactor};

use crate::cli::format::{print_json, timestamp};
use crate::cli::{open_store, OutputFormat};

/// Arguments for the show command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode show                         Show the most recent conversation\n    \
    bocode show abc123                  Show by ID prefix\n    \
    bocode show abc123 --format json    Output as JSON\n    \
    bocode show abc123 -f markdown      Output as markdown")]
pub struct Args {
    /// Conversation ID prefix, or 'last'
    #[arg(value_name = "CONVERSATION", default_value = "last")]
    pub conversation: String,

    /// Output format: text (default), json, markdown
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Executes the show command.
pub fn run(args: Args, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let id = store.resolve(&args.conversation)?;
    let conversation = store.load(&id)?;

    match args.format {
        OutputFormat::Json => print_json(&conversation)?,
        OutputFormat::Markdown => print!("{}", to_markdown(&conversation, &Redactor::none())),
        OutputFormat::Text => print_text(&conversation),
    }
    Ok(())
}

fn print_text(conversation: &Conversation) {
    println!("{} {}", "Conversation".bold(), conversation.id.cyan());
    println!("  {}  {}", "Created:".dimmed(), timestamp(&conversation.created_at));
    println!("  {}  {}", "Updated:".dimmed(), timestamp(&conversation.updated_at));
    if let Some(template) = conversation.template() {
        println!("  {}  {}", "Template:".dimmed(), template);
    }
    if !conversation.tags().is_empty() {
        let tags: Vec<&str> = conversation.tags().iter().map(String::as_str).collect();
        println!("  {}  {}", "Tags:".dimmed(), tags.join(", ").yellow());
    }
    println!();

    if conversation.messages().is_empty() {
        println!("{}", "No messages yet.".dimmed());
        return;
    }

    for message in conversation.messages() {
        let label = match message.role {
            MessageRole::User => "[User]".blue().bold(),
            MessageRole::Assistant => "[Assistant]".green().bold(),
            MessageRole::System => "[System]".magenta().bold(),
        };
        println!(
            "{} {}",
            label,
            message.timestamp.format("%H:%M:%S").to_string().dimmed()
        );
        for line in message.content.lines() {
            println!("  {line}");
        }
        println!();
    }
}
