//! Commit message classification.
//!
//! A Conventional Commits prefix (`feat(scope)!: ...`) wins when its type
//! is recognized. Otherwise the first line is scanned for keywords, in a
//! fixed category order, and anything left over is [`CommitCategory::Other`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic category of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitCategory {
    Feature,
    Fix,
    Refactor,
    Docs,
    Test,
    Style,
    Perf,
    Chore,
    Other,
}

impl CommitCategory {
    pub const ALL: [CommitCategory; 9] = [
        CommitCategory::Feature,
        CommitCategory::Fix,
        CommitCategory::Refactor,
        CommitCategory::Docs,
        CommitCategory::Test,
        CommitCategory::Style,
        CommitCategory::Perf,
        CommitCategory::Chore,
        CommitCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommitCategory::Feature => "feature",
            CommitCategory::Fix => "fix",
            CommitCategory::Refactor => "refactor",
            CommitCategory::Docs => "docs",
            CommitCategory::Test => "test",
            CommitCategory::Style => "style",
            CommitCategory::Perf => "perf",
            CommitCategory::Chore => "chore",
            CommitCategory::Other => "other",
        }
    }
}

impl fmt::Display for CommitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conventional Commits types and the category each maps to.
const PREFIXES: &[(&str, CommitCategory)] = &[
    ("feat", CommitCategory::Feature),
    ("feature", CommitCategory::Feature),
    ("fix", CommitCategory::Fix),
    ("bugfix", CommitCategory::Fix),
    ("hotfix", CommitCategory::Fix),
    ("refactor", CommitCategory::Refactor),
    ("docs", CommitCategory::Docs),
    ("doc", CommitCategory::Docs),
    ("test", CommitCategory::Test),
    ("tests", CommitCategory::Test),
    ("style", CommitCategory::Style),
    ("perf", CommitCategory::Perf),
    ("chore", CommitCategory::Chore),
    ("build", CommitCategory::Chore),
    ("ci", CommitCategory::Chore),
    ("deps", CommitCategory::Chore),
    ("revert", CommitCategory::Chore),
];

/// Keyword table in match priority order.
const KEYWORDS: &[(CommitCategory, &[&str])] = &[
    (
        CommitCategory::Docs,
        &["update docs", "docs", "doc", "documentation", "readme", "changelog"],
    ),
    (
        CommitCategory::Fix,
        &["fix", "fixes", "fixed", "bug", "bugfix", "resolve", "resolves", "hotfix", "patch"],
    ),
    (CommitCategory::Test, &["test", "tests", "testing", "coverage"]),
    (
        CommitCategory::Perf,
        &["perf", "performance", "optimize", "optimise", "faster", "speed up"],
    ),
    (
        CommitCategory::Refactor,
        &["refactor", "refactoring", "restructure", "cleanup", "clean up", "simplify", "rename"],
    ),
    (CommitCategory::Style, &["style", "format", "formatting", "lint", "whitespace"]),
    (
        CommitCategory::Feature,
        &["add", "adds", "added", "implement", "implements", "introduce", "support", "new"],
    ),
    (
        CommitCategory::Chore,
        &["chore", "bump", "upgrade", "update", "deps", "dependency", "dependencies", "release", "merge"],
    ),
];

/// Maps commit messages to categories.
#[derive(Debug, Clone)]
pub struct CommitClassifier {
    /// Per category, each keyword split into lowercase words
    keywords: Vec<(CommitCategory, Vec<Vec<String>>)>,
}

impl Default for CommitClassifier {
    fn default() -> Self {
        let keywords = KEYWORDS
            .iter()
            .map(|(category, words)| (*category, words.iter().map(|w| phrase_words(w)).collect()))
            .collect();
        Self { keywords }
    }
}

impl CommitClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends the built-in keyword table.
    ///
    /// Extra keywords are appended to their category and keep its priority.
    /// Keywords for [`CommitCategory::Other`] are ignored.
    pub fn with_keywords(mut self, extra: &BTreeMap<CommitCategory, Vec<String>>) -> Self {
        for (category, words) in extra {
            if let Some((_, phrases)) = self.keywords.iter_mut().find(|(c, _)| c == category) {
                phrases.extend(
                    words
                        .iter()
                        .map(|w| phrase_words(w))
                        .filter(|p| !p.is_empty()),
                );
            }
        }
        self
    }

    /// Classifies a commit message. Never fails.
    pub fn classify(&self, message: &str) -> CommitCategory {
        let subject = message.lines().next().unwrap_or("").trim();

        if let Some(kind) = conventional_type(subject) {
            if let Some((_, category)) = PREFIXES.iter().find(|(prefix, _)| *prefix == kind) {
                return *category;
            }
        }

        let words = phrase_words(subject);
        self.keywords
            .iter()
            .find(|(_, phrases)| phrases.iter().any(|p| contains_phrase(&words, p)))
            .map(|(category, _)| *category)
            .unwrap_or(CommitCategory::Other)
    }

    /// Counts messages per category, every category included.
    pub fn summarize<'a>(
        &self,
        messages: impl IntoIterator<Item = &'a str>,
    ) -> BTreeMap<CommitCategory, usize> {
        let mut counts: BTreeMap<CommitCategory, usize> =
            CommitCategory::ALL.iter().map(|c| (*c, 0)).collect();
        for message in messages {
            *counts.entry(self.classify(message)).or_insert(0) += 1;
        }
        counts
    }
}

/// Extracts the lowercase type of a `type(scope)!:` prefix.
fn conventional_type(subject: &str) -> Option<String> {
    let type_end = subject
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(subject.len());
    if type_end == 0 {
        return None;
    }

    let (kind, mut rest) = subject.split_at(type_end);
    if let Some(scoped) = rest.strip_prefix('(') {
        let close = scoped.find(')')?;
        rest = &scoped[close + 1..];
    }
    rest = rest.strip_prefix('!').unwrap_or(rest);

    rest.starts_with(':').then(|| kind.to_ascii_lowercase())
}

fn phrase_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn contains_phrase(words: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && words.windows(phrase.len()).any(|window| window == phrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: &str) -> CommitCategory {
        CommitClassifier::new().classify(message)
    }

    #[test]
    fn test_conventional_prefixes() {
        assert_eq!(classify("feat(auth): add 2FA support"), CommitCategory::Feature);
        assert_eq!(classify("fix: null pointer on login"), CommitCategory::Fix);
        assert_eq!(classify("refactor: split parser"), CommitCategory::Refactor);
        assert_eq!(classify("docs: typo"), CommitCategory::Docs);
        assert_eq!(classify("chore(deps): bump serde"), CommitCategory::Chore);
        assert_eq!(classify("test: cover edge cases"), CommitCategory::Test);
        assert_eq!(classify("ci: cache cargo registry"), CommitCategory::Chore);
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        assert_eq!(classify("FEAT: loud feature"), CommitCategory::Feature);
        assert_eq!(classify("Fix(ui): button alignment"), CommitCategory::Fix);
    }

    #[test]
    fn test_breaking_change_marker() {
        assert_eq!(classify("feat!: drop v1 API"), CommitCategory::Feature);
        assert_eq!(classify("refactor(core)!: new store"), CommitCategory::Refactor);
    }

    #[test]
    fn test_prefix_beats_keywords() {
        // "fix" appears in the body of a docs commit
        assert_eq!(classify("docs: fix broken link"), CommitCategory::Docs);
    }

    #[test]
    fn test_unknown_prefix_falls_back_to_keywords() {
        assert_eq!(classify("wip: fix flaky login"), CommitCategory::Fix);
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(classify("Fix crash when config is empty"), CommitCategory::Fix);
        assert_eq!(classify("Resolve bug in parser"), CommitCategory::Fix);
        assert_eq!(classify("Add login page"), CommitCategory::Feature);
        assert_eq!(classify("Implement graph renderer"), CommitCategory::Feature);
        assert_eq!(classify("update docs for install"), CommitCategory::Docs);
        assert_eq!(classify("Bump version to 1.2.0"), CommitCategory::Chore);
        assert_eq!(classify("Merge branch 'main' into dev"), CommitCategory::Chore);
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        // "prefix" contains "fix" and "address" contains "add"
        assert_eq!(classify("Rename prefix address helper"), CommitCategory::Refactor);
        assert_eq!(classify("prefixed addresses"), CommitCategory::Other);
    }

    #[test]
    fn test_only_first_line_is_scanned() {
        assert_eq!(
            classify("Tweak layout\n\nThis will fix the bug in the header"),
            CommitCategory::Other
        );
    }

    #[test]
    fn test_total_classification() {
        for message in [
            "random text with no markers",
            "",
            "   ",
            "(:",
            "feat(",
            "fix(unclosed: x",
            "日本語のコミット",
            "🚀",
        ] {
            let category = classify(message);
            assert!(CommitCategory::ALL.contains(&category));
        }
        assert_eq!(classify("random text with no markers"), CommitCategory::Other);
        assert_eq!(classify(""), CommitCategory::Other);
    }

    #[test]
    fn test_extra_keywords() {
        let mut extra = BTreeMap::new();
        extra.insert(CommitCategory::Perf, vec!["Cache".to_string()]);
        extra.insert(CommitCategory::Other, vec!["ignored".to_string()]);
        let classifier = CommitClassifier::new().with_keywords(&extra);

        assert_eq!(classifier.classify("cache parsed manifests"), CommitCategory::Perf);
        assert_eq!(classifier.classify("ignored"), CommitCategory::Other);
    }

    #[test]
    fn test_summarize_counts_every_category() {
        let counts = CommitClassifier::new().summarize(["feat: a", "fix: b", "fix: c", "hello"]);
        assert_eq!(counts.len(), CommitCategory::ALL.len());
        assert_eq!(counts[&CommitCategory::Fix], 2);
        assert_eq!(counts[&CommitCategory::Feature], 1);
        assert_eq!(counts[&CommitCategory::Other], 1);
        assert_eq!(counts[&CommitCategory::Docs], 0);
        assert_eq!(counts.values().sum::<usize>(), 4);
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&CommitCategory::Feature).unwrap();
        assert_eq!(json, "\"feature\"");
        assert_eq!(CommitCategory::Perf.to_string(), "perf");
    }
}
