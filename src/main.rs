use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bocode_cli::config::Config;

mod cli;

use cli::commands;

/// The main CLI command line interface.
#[derive(Parser)]
#[command(name = "bocode")]
#[command(version)]
#[command(about = "Terminal assistant core - conversations, templates and git insight")]
#[command(long_about = "bocode keeps durable conversation history and reusable prompt\n\
    templates, and reads your git repository to classify commits, triage\n\
    merge conflicts, summarize recent activity and draw the commit graph.")]
#[command(after_help = "EXAMPLES:\n    \
    bocode new \"Explain lifetimes\"      Start a conversation\n    \
    bocode sessions                     List conversations\n    \
    bocode show last                    View the latest conversation\n    \
    bocode search \"borrow\"              Search conversations\n    \
    bocode template render review       Render a saved template\n    \
    bocode git retro --days 14          Summarize the last two weeks\n    \
    bocode git conflicts                Triage merge conflicts\n\n\
    For more information about a command, run 'bocode <command> --help'.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Start a new conversation
    #[command(long_about = "Creates a conversation record, optionally seeded with a system\n\
        prompt, a first message, a rendered template and tags.")]
    New(commands::new::Args),

    /// Append a message to a conversation
    #[command(long_about = "Appends a message to an existing conversation. With --stdin the\n\
        message is read as a stream and only stored once the stream ends.")]
    Append(commands::append::Args),

    /// List conversations
    #[command(long_about = "Lists stored conversations, most recently updated first.\n\
        Unreadable records are skipped and reported.")]
    Sessions(commands::sessions::Args),

    /// Show a conversation
    #[command(long_about = "Displays a conversation's messages in order.\n\
        \n\
        Supports multiple output formats:\n\
        - text: colored terminal output (default)\n\
        - json: machine-readable structured output\n\
        - markdown: formatted for documentation")]
    Show(commands::show::Args),

    /// Search conversations
    #[command(long_about = "Case-insensitive substring search over message content and tags.\n\
        Results are ordered by last update, newest first.")]
    Search(commands::search::Args),

    /// Add or remove conversation tags
    Tag(commands::tag::Args),

    /// Export a conversation as markdown or JSON
    #[command(long_about = "Exports a conversation with optional redaction of secrets such as\n\
        API keys, tokens, passwords and email addresses.")]
    Export(commands::export::Args),

    /// Permanently delete a conversation
    Delete(commands::delete::Args),

    /// Manage prompt templates
    #[command(long_about = "Saves, lists, renders and deletes named prompt templates.\n\
        Placeholders use {{ name }} syntax.")]
    Template(commands::template::Args),

    /// Inspect the current git repository
    #[command(long_about = "Read-mostly git helpers: status, log, diff, commit graph,\n\
        commit categories, conflict triage, retrospectives and stashes.")]
    Git(commands::git::Args),

    /// View and manage configuration settings
    #[command(long_about = "Provides subcommands to show, get, and set configuration values.\n\
        Configuration is stored in ~/.bocode-cli/config.yaml.")]
    Config(commands::config::Args),

    /// Generate shell completion scripts
    Completions(commands::completions::Args),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "bocode=debug"
    } else {
        "bocode=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let mut config = Config::load()?;

    match cli.command {
        Commands::New(args) => commands::new::run(args, &config),
        Commands::Append(args) => commands::append::run(args, &config),
        Commands::Sessions(args) => commands::sessions::run(args, &config),
        Commands::Show(args) => commands::show::run(args, &config),
        Commands::Search(args) => commands::search::run(args, &config),
        Commands::Tag(args) => commands::tag::run(args, &config),
        Commands::Export(args) => commands::export::run(args, &config),
        Commands::Delete(args) => commands::delete::run(args, &config),
        Commands::Template(args) => commands::template::run(args, &config),
        Commands::Git(args) => commands::git::run(args, &config),
        Commands::Config(args) => commands::config::run(args, &mut config),
        Commands::Completions(args) => commands::completions::run(args, &mut Cli::command()),
    }
}
