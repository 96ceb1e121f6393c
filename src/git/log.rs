//! Commit records parsed from `git log` output.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::classify::{CommitCategory, CommitClassifier};
use super::inspector::{GitBackend, GitRequest, LogQuery};
use super::GitError;

const RECORD_SEPARATOR: char = '\x1e';
const FIELD_SEPARATOR: char = '\x1f';

/// A single commit.
///
/// The category is not stored; ask a [`CommitClassifier`] for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub hash: String,
    /// Author identity as `Name <email>`
    pub author: String,
    pub timestamp: DateTime<Utc>,
    /// Full message, trailing whitespace removed
    pub message: String,
    pub files: BTreeSet<String>,
}

impl CommitRecord {
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }

    pub fn category(&self, classifier: &CommitClassifier) -> CommitCategory {
        classifier.classify(&self.message)
    }
}

/// A record that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCommit {
    /// Leading text of the raw record
    pub raw: String,
    pub reason: String,
}

/// Result of parsing log output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedLog {
    pub commits: Vec<CommitRecord>,
    pub skipped: Vec<SkippedCommit>,
}

/// Parses output produced with [`super::inspector::RECORD_FORMAT`].
///
/// Malformed records are collected in [`ParsedLog::skipped`] instead of
/// failing the whole parse.
pub fn parse_log(output: &str) -> ParsedLog {
    let mut parsed = ParsedLog::default();

    for raw in output.split(RECORD_SEPARATOR) {
        if raw.trim().is_empty() {
            continue;
        }
        match parse_record(raw) {
            Ok(commit) => parsed.commits.push(commit),
            Err(reason) => {
                tracing::warn!("Skipping unparseable commit record: {reason}");
                parsed.skipped.push(SkippedCommit {
                    raw: raw.chars().take(60).collect(),
                    reason,
                });
            }
        }
    }

    parsed
}

fn parse_record(raw: &str) -> Result<CommitRecord, String> {
    let fields: Vec<&str> = raw.splitn(5, FIELD_SEPARATOR).collect();
    let [hash, author, date, message, files] = &fields[..] else {
        return Err(format!("expected 5 fields, found {}", fields.len()));
    };

    let hash = hash.trim();
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid hash '{hash}'"));
    }

    let timestamp = DateTime::parse_from_rfc3339(date.trim())
        .map_err(|e| format!("invalid date '{}': {e}", date.trim()))?
        .with_timezone(&Utc);

    Ok(CommitRecord {
        hash: hash.to_string(),
        author: author.trim().to_string(),
        timestamp,
        message: message.trim_end().to_string(),
        files: files
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

/// Fetches and parses commit records.
///
/// A repository without commits yields an empty log.
pub fn load(backend: &dyn GitBackend, query: LogQuery) -> Result<ParsedLog, GitError> {
    if !backend.has_commits(query.all_refs) {
        tracing::debug!("No commits to read");
        return Ok(ParsedLog::default());
    }
    let output = backend.run(&GitRequest::Log(query))?;
    Ok(parse_log(&output.stdout))
}


#[cfg(test)]
mod tests {
    use super::fixtures::record;
    use super::*;
    use crate::git::inspector::testing::CannedBackend;

    #[test]
    fn test_parse_records() {
        let output = [
            record(
                "a1b2c3d4e5f6",
                "Ada <ada@example.com>",
                "2025-03-10T09:00:00+01:00",
                "feat: add parser\n\nLonger body.",
                &["src/parser.rs", "src/lib.rs"],
            ),
            record(
                "0123456789ab",
                "Linus <linus@example.com>",
                "2025-03-09T12:00:00Z",
                "Merge branch 'dev'",
                &[],
            ),
        ]
        .concat();

        let parsed = parse_log(&output);
        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.commits.len(), 2);

        let first = &parsed.commits[0];
        assert_eq!(first.hash, "a1b2c3d4e5f6");
        assert_eq!(first.short_hash(), "a1b2c3d");
        assert_eq!(first.author, "Ada <ada@example.com>");
        assert_eq!(first.subject(), "feat: add parser");
        assert_eq!(first.message, "feat: add parser\n\nLonger body.");
        assert_eq!(first.timestamp, fixtures::at("2025-03-10T08:00:00Z"));
        assert_eq!(first.files.len(), 2);
        assert!(first.files.contains("src/lib.rs"));

        assert!(parsed.commits[1].files.is_empty());
    }

    #[test]
    fn test_category_is_derived() {
        let parsed = parse_log(&record(
            "abc123",
            "A <a@x>",
            "2025-01-01T00:00:00Z",
            "fix: crash",
            &["a.rs"],
        ));
        let classifier = CommitClassifier::new();
        assert_eq!(parsed.commits[0].category(&classifier), CommitCategory::Fix);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let output = [
            "\x1enot-enough-fields".to_string(),
            record("zzzz", "A <a@x>", "2025-01-01T00:00:00Z", "bad hash", &[]),
            record("abc123", "A <a@x>", "yesterday", "bad date", &[]),
            record("def456", "B <b@x>", "2025-01-02T00:00:00Z", "good", &["f"]),
        ]
        .concat();

        let parsed = parse_log(&output);
        assert_eq!(parsed.commits.len(), 1);
        assert_eq!(parsed.commits[0].hash, "def456");
        assert_eq!(parsed.skipped.len(), 3);
    }

    #[test]
    fn test_empty_output() {
        let parsed = parse_log("");
        assert!(parsed.commits.is_empty());
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_load_through_backend() {
        let backend = CannedBackend::new().respond(
            GitRequest::Log(LogQuery::records()),
            &record("abc123", "A <a@x>", "2025-01-01T00:00:00Z", "docs: readme", &["README.md"]),
        );

        let parsed = load(&backend, LogQuery::records().count(1)).unwrap();
        assert_eq!(parsed.commits.len(), 1);
        assert_eq!(backend.seen.borrow().len(), 1);
    }

    #[test]
    fn test_load_without_commits_skips_git() {
        let backend = CannedBackend::new().unborn();
        let parsed = load(&backend, LogQuery::records()).unwrap();
        assert_eq!(parsed, ParsedLog::default());
        assert!(backend.seen.borrow().is_empty());
    }
}
