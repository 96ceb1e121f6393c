//! Command-line interface for bocode.
//!
//! Each command module parses its own arguments and drives the library
//! components with values taken from the loaded configuration.

use anyhow::{Context, Result};

use bocode_cli::config::Config;
use bocode_cli::git::GitInspector;
use bocode_cli::storage::{default_history_dir, SessionStore};
use bocode_cli::templates::{default_template_dir, TemplateRegistry};

/// Individual CLI command implementations.
pub mod commands;

/// Output format utilities.
pub mod format;

pub use format::OutputFormat;

/// Opens the conversation store under the configured data directory.
pub fn open_store(config: &Config) -> Result<SessionStore> {
    let dir = default_history_dir(&config.data_dir()?);
    SessionStore::open(&dir).with_context(|| format!("Failed to open history at {}", dir.display()))
}

/// Opens the template registry under the configured data directory.
pub fn open_templates(config: &Config) -> Result<TemplateRegistry> {
    let dir = default_template_dir(&config.data_dir()?);
    TemplateRegistry::open(&dir)
        .with_context(|| format!("Failed to open templates at {}", dir.display()))
}

/// Discovers the repository containing the current directory.
pub fn open_repository() -> Result<GitInspector> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(GitInspector::open(&cwd)?)
}

/// Shortens an id for display.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Truncates to at most `max` characters, appending "..." when cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return ".".repeat(max);
    }
    let kept: String = s.chars().take(max - 3).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 8), "hello...");
        assert_eq!(truncate_chars("héllo wörld", 8), "héllo...");
        assert_eq!(truncate_chars("hello", 2), "..");
    }
}
