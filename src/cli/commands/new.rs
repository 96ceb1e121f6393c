//! New command - start a conversation.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use colored::Colorize;

use bocode_cli::config::Config;
use bocode_cli::storage::MessageRole;
use bocode_cli::templates::{parse_assignment, RenderMode};

use crate::cli::{open_store, open_templates, short_id};

/// Arguments for the new command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode new \"How do I split a string?\"         Start with a question\n    \
    bocode new --system \"Answer in French\"         Seed a system prompt\n    \
    bocode new --template review --var file=a.rs   Start from a template\n    \
    bocode new --tag rust --tag parser             Tag the conversation")]
pub struct Args {
    /// First user message
    #[arg(value_name = "MESSAGE")]
    pub message: Option<String>,

    /// System prompt stored before any other message
    #[arg(long, value_name = "TEXT")]
    pub system: Option<String>,

    /// Render this template as the first user message
    #[arg(short, long, value_name = "NAME")]
    pub template: Option<String>,

    /// Template variable (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE", requires = "template")]
    pub vars: Vec<String>,

    /// Tag to attach (repeatable)
    #[arg(long = "tag", value_name = "LABEL")]
    pub tags: Vec<String>,
}

/// Executes the new command.
pub fn run(args: Args, config: &Config) -> Result<()> {
    if args.message.is_some() && args.template.is_some() {
        bail!("Provide either a message or --template, not both");
    }

    let store = open_store(config)?;
    let mut conversation = store.create();

    if let Some(system) = &args.system {
        conversation.push_message(MessageRole::System, system.as_str());
    }

    if let Some(name) = &args.template {
        let variables = args
            .vars
            .iter()
            .map(|v| parse_assignment(v))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        let registry = open_templates(config)?;
        let rendered = registry.render(
            name,
            &variables,
            RenderMode::from_strict(config.strict_templates),
        )?;
        conversation.push_message(MessageRole::User, rendered);
        conversation.set_template(name.as_str());
    }

    if let Some(message) = &args.message {
        conversation.push_message(MessageRole::User, message.as_str());
    }

    for tag in &args.tags {
        conversation.add_tag(tag);
    }

    store.save(&conversation)?;

    println!(
        "{} {}",
        "Created conversation".green(),
        short_id(&conversation.id).cyan()
    );
    println!("{}", conversation.id.dimmed());
    Ok(())
}
