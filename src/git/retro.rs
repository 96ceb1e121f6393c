//! Retrospective statistics over a window of commits.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::classify::{CommitCategory, CommitClassifier};
use super::inspector::{GitBackend, LogQuery};
use super::log::{self, CommitRecord, SkippedCommit};
use super::GitError;

/// Largest accepted window, about ten years.
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// A key with its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally<K> {
    pub key: K,
    pub count: usize,
}

/// First and last commit of an author within the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSpan {
    pub author: String,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

/// Statistics for one reporting period.
///
/// Tallies are sorted by descending count, ties broken by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrospectivePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub window_days: i64,
    pub total_commits: usize,
    pub authors: Vec<Tally<String>>,
    /// Every category, including those with no commits
    pub categories: Vec<Tally<CommitCategory>>,
    pub files: Vec<Tally<String>>,
    pub author_spans: Vec<AuthorSpan>,
    /// Log records that could not be parsed
    pub skipped: Vec<SkippedCommit>,
}

impl RetrospectivePeriod {
    pub fn is_empty(&self) -> bool {
        self.total_commits == 0
    }

    pub fn commits_per_day(&self) -> f64 {
        self.total_commits as f64 / self.window_days as f64
    }

    pub fn category_count(&self, category: CommitCategory) -> usize {
        self.categories
            .iter()
            .find(|t| t.key == category)
            .map_or(0, |t| t.count)
    }
}

/// Groups commits by author, category and file.
pub struct RetrospectiveAggregator<'a> {
    classifier: &'a CommitClassifier,
}

impl<'a> RetrospectiveAggregator<'a> {
    pub fn new(classifier: &'a CommitClassifier) -> Self {
        Self { classifier }
    }

    /// Aggregates commits inside `[now - window_days, now]`.
    pub fn aggregate(
        &self,
        commits: &[CommitRecord],
        window_days: i64,
    ) -> Result<RetrospectivePeriod, GitError> {
        self.aggregate_at(commits, window_days, Utc::now())
    }

    /// Like [`Self::aggregate`] with an explicit end of the window.
    pub fn aggregate_at(
        &self,
        commits: &[CommitRecord],
        window_days: i64,
        now: DateTime<Utc>,
    ) -> Result<RetrospectivePeriod, GitError> {
        validate_window(window_days)?;
        let start = now - Duration::days(window_days);

        let mut authors: HashMap<&str, usize> = HashMap::new();
        let mut categories: HashMap<CommitCategory, usize> =
            CommitCategory::ALL.iter().map(|c| (*c, 0)).collect();
        let mut files: HashMap<&str, usize> = HashMap::new();
        let mut spans: HashMap<&str, (DateTime<Utc>, DateTime<Utc>)> = HashMap::new();
        let mut total = 0;

        for commit in commits
            .iter()
            .filter(|c| c.timestamp >= start && c.timestamp <= now)
        {
            total += 1;
            *authors.entry(commit.author.as_str()).or_insert(0) += 1;
            *categories.entry(commit.category(self.classifier)).or_insert(0) += 1;
            for file in &commit.files {
                *files.entry(file.as_str()).or_insert(0) += 1;
            }

            spans
                .entry(commit.author.as_str())
                .and_modify(|(first, last)| {
                    *first = (*first).min(commit.timestamp);
                    *last = (*last).max(commit.timestamp);
                })
                .or_insert((commit.timestamp, commit.timestamp));
        }

        let mut author_spans: Vec<AuthorSpan> = spans
            .into_iter()
            .map(|(author, (first, last))| AuthorSpan {
                author: author.to_string(),
                first,
                last,
            })
            .collect();
        author_spans.sort_by(|a, b| a.first.cmp(&b.first).then_with(|| a.author.cmp(&b.author)));

        tracing::debug!("Aggregated {total} commits over {window_days} days");

        Ok(RetrospectivePeriod {
            start,
            end: now,
            window_days,
            total_commits: total,
            authors: sorted_tallies(authors.into_iter().map(|(k, v)| (k.to_string(), v))),
            categories: sorted_tallies(categories),
            files: sorted_tallies(files.into_iter().map(|(k, v)| (k.to_string(), v))),
            author_spans,
            skipped: Vec::new(),
        })
    }

    /// Fetches the window's commits from git and aggregates them.
    pub fn collect(
        &self,
        backend: &dyn GitBackend,
        window_days: i64,
    ) -> Result<RetrospectivePeriod, GitError> {
        validate_window(window_days)?;
        let now = Utc::now();

        let parsed = log::load(
            backend,
            LogQuery::records().since(now - Duration::days(window_days)),
        )?;
        let mut period = self.aggregate_at(&parsed.commits, window_days, now)?;
        period.skipped = parsed.skipped;
        Ok(period)
    }
}

fn validate_window(window_days: i64) -> Result<(), GitError> {
    if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
        return Err(GitError::InvalidWindow {
            days: window_days,
            max: MAX_WINDOW_DAYS,
        });
    }
    Ok(())
}

fn sorted_tallies<K: Ord + Eq + Hash>(counts: impl IntoIterator<Item = (K, usize)>) -> Vec<Tally<K>> {
    let mut tallies: Vec<Tally<K>> = counts
        .into_iter()
        .map(|(key, count)| Tally { key, count })
        .collect();
    tallies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::inspector::testing::CannedBackend;
    use crate::git::inspector::GitRequest;
    use crate::git::log::fixtures::{at, record};
    use crate::git::log::parse_log;

    fn commit(author: &str, date: &str, message: &str, files: &[&str]) -> CommitRecord {
        CommitRecord {
            hash: "abc123".to_string(),
            author: author.to_string(),
            timestamp: at(date),
            message: message.to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn now() -> DateTime<Utc> {
        at("2025-06-15T12:00:00Z")
    }

    #[test]
    fn test_tallies_sum_to_total() {
        let classifier = CommitClassifier::new();
        let aggregator = RetrospectiveAggregator::new(&classifier);
        let commits = vec![
            commit("Ada", "2025-06-14T10:00:00Z", "feat: a", &["src/a.rs", "src/b.rs"]),
            commit("Ada", "2025-06-13T10:00:00Z", "fix: b", &["src/a.rs"]),
            commit("Bo", "2025-06-12T10:00:00Z", "docs: c", &["README.md"]),
            commit("Cy", "2025-06-10T10:00:00Z", "whatever", &[]),
        ];

        let period = aggregator.aggregate_at(&commits, 14, now()).unwrap();
        assert_eq!(period.total_commits, 4);
        assert_eq!(period.authors.iter().map(|t| t.count).sum::<usize>(), 4);
        assert_eq!(period.categories.iter().map(|t| t.count).sum::<usize>(), 4);
        assert_eq!(period.categories.len(), CommitCategory::ALL.len());
        assert_eq!(period.category_count(CommitCategory::Other), 1);

        assert_eq!(period.authors[0], Tally { key: "Ada".to_string(), count: 2 });
        assert_eq!(period.files[0], Tally { key: "src/a.rs".to_string(), count: 2 });
        assert_eq!(period.files.iter().map(|t| t.count).sum::<usize>(), 4);
    }

    #[test]
    fn test_commits_outside_window_are_excluded() {
        let classifier = CommitClassifier::new();
        let aggregator = RetrospectiveAggregator::new(&classifier);
        let commits = vec![
            commit("Ada", "2025-06-14T10:00:00Z", "feat: in", &[]),
            commit("Ada", "2025-05-01T10:00:00Z", "feat: too old", &[]),
            commit("Ada", "2025-06-16T10:00:00Z", "feat: future", &[]),
            commit("Ada", "2025-06-08T12:00:00Z", "feat: on the boundary", &[]),
        ];

        let period = aggregator.aggregate_at(&commits, 7, now()).unwrap();
        assert_eq!(period.total_commits, 2);
        assert_eq!(period.start, at("2025-06-08T12:00:00Z"));
    }

    #[test]
    fn test_empty_window_is_all_zero() {
        let classifier = CommitClassifier::new();
        let aggregator = RetrospectiveAggregator::new(&classifier);

        let period = aggregator.aggregate_at(&[], 14, now()).unwrap();
        assert!(period.is_empty());
        assert!(period.authors.is_empty());
        assert!(period.files.is_empty());
        assert!(period.categories.iter().all(|t| t.count == 0));
        assert_eq!(period.commits_per_day(), 0.0);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let classifier = CommitClassifier::new();
        let aggregator = RetrospectiveAggregator::new(&classifier);
        for days in [0, -3, MAX_WINDOW_DAYS + 1] {
            assert!(matches!(
                aggregator.aggregate_at(&[], days, now()),
                Err(GitError::InvalidWindow { .. })
            ));
        }
    }

    #[test]
    fn test_ties_sorted_by_key() {
        let classifier = CommitClassifier::new();
        let aggregator = RetrospectiveAggregator::new(&classifier);
        let commits = vec![
            commit("Zed", "2025-06-14T10:00:00Z", "x", &[]),
            commit("Amy", "2025-06-14T11:00:00Z", "y", &[]),
        ];

        let period = aggregator.aggregate_at(&commits, 14, now()).unwrap();
        let names: Vec<&str> = period.authors.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);
    }

    #[test]
    fn test_author_spans() {
        let classifier = CommitClassifier::new();
        let aggregator = RetrospectiveAggregator::new(&classifier);
        let commits = vec![
            commit("Ada", "2025-06-14T10:00:00Z", "a", &[]),
            commit("Ada", "2025-06-02T10:00:00Z", "b", &[]),
            commit("Bo", "2025-06-10T10:00:00Z", "c", &[]),
        ];

        let period = aggregator.aggregate_at(&commits, 14, now()).unwrap();
        assert_eq!(period.author_spans.len(), 2);
        assert_eq!(period.author_spans[0].author, "Ada");
        assert_eq!(period.author_spans[0].first, at("2025-06-02T10:00:00Z"));
        assert_eq!(period.author_spans[0].last, at("2025-06-14T10:00:00Z"));
    }

    #[test]
    fn test_collect_through_backend() {
        let recent = (Utc::now() - Duration::days(1)).to_rfc3339();
        let output = [
            record("aaa111", "Ada <a@x>", &recent, "feat: one", &["a.rs"]),
            "\x1ebroken".to_string(),
        ]
        .concat();
        assert_eq!(parse_log(&output).commits.len(), 1);

        let backend = CannedBackend::new().respond(GitRequest::Log(LogQuery::records()), &output);
        let classifier = CommitClassifier::new();
        let period = RetrospectiveAggregator::new(&classifier)
            .collect(&backend, 14)
            .unwrap();

        assert_eq!(period.total_commits, 1);
        assert_eq!(period.skipped.len(), 1);
        let seen = backend.seen.borrow();
        match &seen[0] {
            GitRequest::Log(query) => assert!(query.since.is_some()),
            other => panic!("unexpected request {other:?}"),
        };
    }

    #[test]
    fn test_collect_rejects_window_before_running_git() {
        let backend = CannedBackend::new();
        let classifier = CommitClassifier::new();
        let result = RetrospectiveAggregator::new(&classifier).collect(&backend, 0);
        assert!(matches!(result, Err(GitError::InvalidWindow { .. })));
        assert!(backend.seen.borrow().is_empty());
    }

    #[test]
    fn test_collect_without_commits_is_zeroed() {
        let backend = CannedBackend::new().unborn();
        let classifier = CommitClassifier::new();
        let period = RetrospectiveAggregator::new(&classifier)
            .collect(&backend, 14)
            .unwrap();

        assert_eq!(period.total_commits, 0);
        assert!(period.authors.is_empty());
        assert!(period.files.is_empty());
        assert!(period.categories.iter().all(|t| t.count == 0));
    }
}
