//! Output helpers shared by the commands.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

/// How a command prints its result.
///
/// `Markdown` is only meaningful for `show`; other commands treat it as text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored terminal output (default).
    #[default]
    Text,
    /// Pretty-printed JSON for scripting.
    Json,
    /// Markdown document.
    Markdown,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// Prints a value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Full timestamp for detail views.
pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Minute-precision timestamp for tables.
pub fn short_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_format_names() {
        assert_eq!(
            OutputFormat::from_str("json", true).unwrap(),
            OutputFormat::Json
        );
        assert!(OutputFormat::from_str("yaml", true).is_err());
        assert!(OutputFormat::Json.is_json());
        assert!(!OutputFormat::default().is_json());
    }

    #[test]
    fn test_timestamps() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 42).unwrap();
        assert_eq!(timestamp(&at), "2024-03-09 07:05:42");
        assert_eq!(short_timestamp(&at), "2024-03-09 07:05");
    }
}
