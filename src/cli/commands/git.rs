//! Git command - inspect the repository around the current directory.

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;

use bocode_cli::config::Config;
use bocode_cli::git::conflict::{analyze_repository, ConflictReport};
use bocode_cli::git::retro::RetrospectivePeriod;
use bocode_cli::git::status::{self, WorkingTreeStatus};
use bocode_cli::git::{
    log, CommitCategory, CommitClassifier, ConflictAnalyzer, ConflictType, DiffTarget, GitBackend,
    GitRequest, LogGraph, LogGraphRenderer, LogQuery, RetrospectiveAggregator,
};

use crate::cli::format::print_json;
use crate::cli::{open_repository, truncate_chars, OutputFormat};

#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode git status                 Branch and working tree summary\n    \
    bocode git graph --all            Commit graph across all branches\n    \
    bocode git categories -n 50       Classify the last 50 commits\n    \
    bocode git conflicts              Triage merge conflicts\n    \
    bocode git retro --days 7         Weekly retrospective\n    \
    bocode git stash save \"wip\"       Stash local changes")]
pub struct Args {
    #[command(subcommand)]
    pub command: GitCommand,
}

#[derive(Subcommand)]
pub enum GitCommand {
    /// Show branch and working tree status
    Status {
        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show recent commits
    Log {
        /// Number of commits (defaults to the configured log_count)
        #[arg(short = 'n', long, value_name = "N")]
        count: Option<usize>,

        /// Only commits whose author matches this pattern
        #[arg(long)]
        author: Option<String>,

        /// Include every branch
        #[arg(long)]
        all: bool,
    },
    /// Show changes in the working tree or between revisions
    Diff {
        /// Compare staged changes against HEAD
        #[arg(long, conflicts_with = "revisions")]
        staged: bool,

        /// Show a diffstat instead of the full patch
        #[arg(long)]
        stat: bool,

        /// Zero, one or two revisions
        #[arg(value_name = "REV", num_args = 0..=2)]
        revisions: Vec<String>,
    },
    /// Find the best common ancestor of two revisions
    MergeBase { left: String, right: String },
    /// Draw the commit graph
    Graph {
        /// Number of commits (defaults to the configured log_count)
        #[arg(short = 'n', long, value_name = "N")]
        count: Option<usize>,

        /// Include every branch
        #[arg(long)]
        all: bool,

        /// Keep git's ASCII glyphs
        #[arg(long)]
        ascii: bool,

        /// Disable lane colors
        #[arg(long)]
        no_color: bool,
    },
    /// Classify recent commits by category
    Categories {
        /// Number of commits (defaults to the configured log_count)
        #[arg(short = 'n', long, value_name = "N")]
        count: Option<usize>,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Analyze merge conflicts in the working tree
    Conflicts {
        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Summarize activity over a recent window
    Retro {
        /// Window length in days (defaults to the configured retrospective_days)
        #[arg(short, long, value_name = "DAYS")]
        days: Option<i64>,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List, save or apply stashes
    Stash {
        #[command(subcommand)]
        command: Option<StashCommand>,
    },
}

#[derive(Subcommand)]
pub enum StashCommand {
    /// List stashes
    List,
    /// Stash local changes
    Save { message: Option<String> },
    /// Apply a stash without dropping it
    Apply {
        #[arg(default_value = "0")]
        index: usize,
    },
}

pub fn run(args: Args, config: &Config) -> Result<()> {
    let repo = open_repository()?;
    let classifier = CommitClassifier::new().with_keywords(&config.classifier.keywords);

    match args.command {
        GitCommand::Status { format } => {
            let status = status::status(&repo)?;
            match format {
                OutputFormat::Json => print_json(&status)?,
                _ => print_status(&status),
            }
        }
        GitCommand::Log { count, author, all } => {
            if !repo.has_commits(all) {
                println!("{}", "No commits yet.".dimmed());
                return Ok(());
            }
            let mut query = LogQuery::oneline()
                .count(count.unwrap_or(config.log_count))
                .all_refs(all);
            if let Some(author) = author {
                query = query.author(author);
            }
            print!("{}", ensure_newline(repo.run(&GitRequest::Log(query))?.stdout));
        }
        GitCommand::Diff {
            staged,
            stat,
            mut revisions,
        } => {
            let target = match (staged, revisions.len()) {
                (true, _) => DiffTarget::Staged,
                (false, 0) => DiffTarget::WorkingTree,
                (false, 1) => DiffTarget::Revision(revisions.remove(0)),
                (false, _) => {
                    let to = revisions.remove(1);
                    DiffTarget::Range(revisions.remove(0), to)
                }
            };
            let output = repo.run(&GitRequest::Diff { target, stat })?;
            if output.stdout.is_empty() {
                println!("{}", "No differences.".dimmed());
            } else {
                print!("{}", ensure_newline(output.stdout));
            }
        }
        GitCommand::MergeBase { left, right } => {
            let output = repo.run(&GitRequest::MergeBase { left, right })?;
            println!("{}", output.stdout.trim());
        }
        GitCommand::Graph {
            count,
            all,
            ascii,
            no_color,
        } => {
            let graph = LogGraph::load(&repo, count.unwrap_or(config.log_count), all)?;
            if graph.is_empty() {
                println!("{}", "No commits yet.".dimmed());
                return Ok(());
            }
            let renderer = LogGraphRenderer::new(
                config.graph.unicode && !ascii,
                config.graph.color && !no_color,
            );
            print!("{}", renderer.render(&graph));
        }
        GitCommand::Categories { count, format } => {
            let parsed = log::load(
                &repo,
                LogQuery::records().count(count.unwrap_or(config.log_count)),
            )?;
            let counts = classifier.summarize(parsed.commits.iter().map(|c| c.message.as_str()));

            if format.is_json() {
                let commits: Vec<_> = parsed
                    .commits
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "hash": c.hash,
                            "subject": c.subject(),
                            "category": c.category(&classifier),
                        })
                    })
                    .collect();
                return print_json(&serde_json::json!({
                    "counts": counts,
                    "commits": commits,
                    "skipped": parsed.skipped,
                }));
            }

            for commit in &parsed.commits {
                let category = commit.category(&classifier);
                println!(
                    "{}  {}  {}",
                    commit.short_hash().yellow(),
                    category_label(category),
                    truncate_chars(commit.subject(), 72)
                );
            }
            println!();
            println!("{}", "Summary".bold());
            for (category, count) in counts.iter().filter(|(_, n)| **n > 0) {
                println!("  {}  {count}", category_label(*category));
            }
            if !parsed.skipped.is_empty() {
                println!(
                    "{}",
                    format!("Skipped {} unparseable record(s).", parsed.skipped.len()).yellow()
                );
            }
        }
        GitCommand::Conflicts { format } => {
            let analyzer = ConflictAnalyzer::new(config.conflict);
            let report = analyze_repository(&repo, &analyzer)?;
            match format {
                OutputFormat::Json => print_json(&report)?,
                _ => print_conflicts(&report),
            }
        }
        GitCommand::Retro { days, format } => {
            let days = days.unwrap_or(config.retrospective_days);
            let period = RetrospectiveAggregator::new(&classifier).collect(&repo, days)?;
            match format {
                OutputFormat::Json => print_json(&period)?,
                _ => print_retro(&period),
            }
        }
        GitCommand::Stash { command } => run_stash(&repo, command.unwrap_or(StashCommand::List))?,
    }

    Ok(())
}

fn run_stash(repo: &dyn GitBackend, command: StashCommand) -> Result<()> {
    match command {
        StashCommand::List => {
            let entries = status::stash_list(repo)?;
            if entries.is_empty() {
                println!("{}", "No stashes.".dimmed());
            }
            for entry in entries {
                println!(
                    "{}  {}",
                    format!("stash@{{{}}}", entry.index).yellow(),
                    entry.description
                );
            }
        }
        StashCommand::Save { message } => {
            let output = repo.run(&GitRequest::StashCreate { message })?;
            let text = output.stdout.trim();
            if text.starts_with("No local changes") {
                println!("{}", "No local changes to stash.".dimmed());
            } else {
                println!("{} {}", "Stashed:".green(), text);
            }
        }
        StashCommand::Apply { index } => {
            let entries = status::stash_list(repo)?;
            if !entries.iter().any(|e| e.index == index) {
                bail!("No stash at index {index}. Run 'bocode git stash list'.");
            }
            repo.run(&GitRequest::StashApply { index })?;
            println!("{} stash@{{{index}}}", "Applied".green());
        }
    }
    Ok(())
}

fn ensure_newline(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn category_label(category: CommitCategory) -> String {
    let label = format!("{:<8}", category.as_str());
    match category {
        CommitCategory::Feature => label.green().to_string(),
        CommitCategory::Fix => label.red().to_string(),
        CommitCategory::Docs => label.blue().to_string(),
        CommitCategory::Other => label.dimmed().to_string(),
        _ => label.cyan().to_string(),
    }
}

fn print_status(status: &WorkingTreeStatus) {
    let branch = status.branch.as_deref().unwrap_or("(detached HEAD)");
    print!("{} {}", "On branch".bold(), branch.cyan());
    if let Some(upstream) = &status.upstream {
        print!(" {}", format!("tracking {upstream}").dimmed());
    }
    println!();
    if status.ahead > 0 || status.behind > 0 {
        println!(
            "  {}",
            format!("ahead {}, behind {}", status.ahead, status.behind).yellow()
        );
    }

    if status.is_clean() {
        println!("{}", "Working tree clean.".green());
        return;
    }

    let sections: [(&str, &Vec<String>, colored::Color); 4] = [
        ("Conflicted", &status.conflicted, colored::Color::Red),
        ("Staged", &status.staged, colored::Color::Green),
        ("Modified", &status.modified, colored::Color::Yellow),
        ("Untracked", &status.untracked, colored::Color::BrightBlack),
    ];
    for (title, paths, color) in sections {
        if paths.is_empty() {
            continue;
        }
        println!();
        println!("{} ({})", title.bold(), paths.len());
        for path in paths {
            println!("  {}", path.color(color));
        }
    }
}

fn print_conflicts(report: &ConflictReport) {
    if report.files.is_empty() {
        println!("{}", "No merge conflicts.".green());
        return;
    }

    for file in &report.files {
        println!("{}", file.path.bold());
        if let Some(error) = &file.error {
            println!("  {} {}", "Could not read:".red(), error);
            continue;
        }
        for warning in &file.warnings {
            println!("  {} {}", "Warning:".yellow(), warning);
        }
        for hunk in &file.hunks {
            let kind = match hunk.kind {
                ConflictType::ModificationMajor => hunk.kind.to_string().red(),
                ConflictType::ModificationMinor => hunk.kind.to_string().yellow(),
                _ => hunk.kind.to_string().cyan(),
            };
            println!("  {} {}  {}", format!("line {}", hunk.line).dimmed(), kind, hunk.suggestion);
            if hunk.kind == ConflictType::ModificationMajor {
                print_side("ours", hunk.ours_label.as_deref(), &hunk.ours);
                print_side("theirs", hunk.theirs_label.as_deref(), &hunk.theirs);
            }
        }
        println!();
    }

    println!(
        "{}",
        format!(
            "{} conflict(s) in {} file(s).",
            report.hunk_count(),
            report.files.len()
        )
        .bold()
    );
    let commands = report.resolution_commands();
    if !commands.is_empty() {
        println!();
        println!("{}", "Whole-file resolutions:".bold());
        for command in commands {
            println!("  {command}");
        }
    }
}

fn print_side(side: &str, label: Option<&str>, content: &str) {
    let title = match label {
        Some(label) => format!("{side} ({label})"),
        None => side.to_string(),
    };
    println!("    {}", title.dimmed());
    for line in content.lines() {
        println!("    | {line}");
    }
}

fn print_retro(period: &RetrospectivePeriod) {
    println!(
        "{} {} to {} ({} days)",
        "Retrospective".bold(),
        period.start.format("%Y-%m-%d"),
        period.end.format("%Y-%m-%d"),
        period.window_days
    );

    if period.is_empty() {
        println!("{}", "No commits in this window.".dimmed());
        return;
    }

    println!(
        "  {} commits by {} author(s), {:.1} per day",
        period.total_commits,
        period.authors.len(),
        period.commits_per_day()
    );

    println!();
    println!("{}", "Authors".bold());
    for tally in &period.authors {
        println!("  {:>4}  {}", tally.count, tally.key);
    }

    println!();
    println!("{}", "Categories".bold());
    for tally in period.categories.iter().filter(|t| t.count > 0) {
        println!("  {:>4}  {}", tally.count, category_label(tally.key));
    }

    println!();
    println!("{}", "Most changed files".bold());
    for tally in period.files.iter().take(10) {
        println!("  {:>4}  {}", tally.count, tally.key);
    }

    if !period.skipped.is_empty() {
        println!();
        println!(
            "{}",
            format!("Skipped {} unparseable record(s).", period.skipped.len()).yellow()
        );
    }
}
