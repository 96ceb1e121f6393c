//! Template command - manage named prompt templates.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;

use bocode_cli::config::Config;
use bocode_cli::templates::{parse_assignment, RenderMode};

use crate::cli::format::{print_json, timestamp};
use crate::cli::{open_templates, OutputFormat};

#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode template save review --content \"Review {{ file }} for {{ focus }}\"\n    \
    bocode template save review --file prompts/review.txt --default focus=bugs\n    \
    bocode template render review --var file=src/main.rs\n    \
    bocode template list")]
pub struct Args {
    #[command(subcommand)]
    pub command: TemplateCommand,
}

#[derive(Subcommand)]
pub enum TemplateCommand {
    /// List saved templates
    List {
        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show a template and its placeholders
    Show {
        name: String,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Create or replace a template
    Save {
        name: String,

        /// Template body
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        content: Option<String>,

        /// Read the template body from a file
        #[arg(long, value_name = "PATH")]
        file: Option<String>,

        /// Default variable value (repeatable)
        #[arg(long = "default", value_name = "KEY=VALUE")]
        defaults: Vec<String>,
    },
    /// Render a template with variables
    Render {
        name: String,

        /// Template variable (repeatable)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Leave unresolved placeholders instead of failing
        #[arg(long)]
        lenient: bool,
    },
    /// Delete a template
    Delete { name: String },
}

pub fn run(args: Args, config: &Config) -> Result<()> {
    let registry = open_templates(config)?;

    match args.command {
        TemplateCommand::List { format } => {
            let names = registry.list()?;
            if format.is_json() {
                return print_json(&names);
            }
            if names.is_empty() {
                println!("{}", "No templates saved.".dimmed());
            }
            for name in names {
                println!("{}", name.cyan());
            }
        }
        TemplateCommand::Show { name, format } => {
            let template = registry.load(&name)?;
            if format.is_json() {
                return print_json(&template);
            }
            println!("{} {}", "Template".bold(), template.name.cyan());
            println!("  {}  {}", "Updated:".dimmed(), timestamp(&template.updated_at));
            let placeholders = template.placeholders();
            if !placeholders.is_empty() {
                println!("  {}  {}", "Variables:".dimmed(), placeholders.join(", ").yellow());
            }
            for (key, value) in &template.defaults {
                println!("  {}  {key}={value}", "Default:".dimmed());
            }
            println!();
            println!("{}", template.content);
        }
        TemplateCommand::Save {
            name,
            content,
            file,
            defaults,
        } => {
            let body = match (content, file) {
                (Some(content), _) => content,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {path}"))?,
                (None, None) => bail!("Provide --content or --file"),
            };
            let defaults = parse_assignments(&defaults)?;
            let template = registry.save(&name, &body, defaults)?;
            println!(
                "{} template {} ({} variables)",
                "Saved".green(),
                template.name.cyan(),
                template.placeholders().len()
            );
        }
        TemplateCommand::Render {
            name,
            vars,
            lenient,
        } => {
            let mode = if lenient {
                RenderMode::Lenient
            } else {
                RenderMode::from_strict(config.strict_templates)
            };
            let rendered = registry.render(&name, &parse_assignments(&vars)?, mode)?;
            println!("{rendered}");
        }
        TemplateCommand::Delete { name } => {
            registry.delete(&name)?;
            println!("{} template {}", "Deleted".green(), name.cyan());
        }
    }

    Ok(())
}

fn parse_assignments(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    Ok(pairs
        .iter()
        .map(|p| parse_assignment(p))
        .collect::<Result<BTreeMap<_, _>, _>>()?)
}
