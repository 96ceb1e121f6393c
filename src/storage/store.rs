//! File-backed conversation store.
//!
//! Owns the history directory exclusively: one `<id>.json` record per
//! conversation. Bulk operations (listing, search) read records one at a
//! time and report corrupted records instead of aborting.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::atomic::write_atomic;
use super::export::{self, Redactor};
use super::models::{Conversation, ConversationSummary, MessageRole};
use super::{json_records, validate_record_name, StorageError};

/// Record kind used in error messages.
const KIND: &str = "conversation";

/// Reference that resolves to the most recently modified conversation.
pub const LAST: &str = "last";

/// Characters of context kept on each side of a search match.
const EXCERPT_CONTEXT: usize = 40;

/// Returns the history directory inside an application data directory.
pub fn default_history_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("history")
}

/// A record that could not be read during a bulk operation.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    pub path: PathBuf,
    pub reason: String,
}

/// Conversation summaries ordered by last modification, newest first.
#[derive(Debug, Default)]
pub struct Listing {
    pub conversations: Vec<ConversationSummary>,
    pub skipped: Vec<SkippedRecord>,
}

impl Listing {
    pub fn iter(&self) -> std::slice::Iter<'_, ConversationSummary> {
        self.conversations.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

/// Where a search query matched inside a conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MatchLocation {
    /// Matched the content of the message at `index`.
    Message { index: usize, role: MessageRole },
    /// Matched a tag.
    Tag { tag: String },
}

/// A conversation matching a search query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub updated_at: DateTime<Utc>,
    /// First match, in conversational order
    pub location: MatchLocation,
    /// Text surrounding the first match
    pub excerpt: String,
    /// Number of matches across messages and tags
    pub match_count: usize,
}

/// Search hits ordered by last modification, newest first.
#[derive(Debug, Default)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub skipped: Vec<SkippedRecord>,
}

/// Durable, searchable conversation state.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Directory holding the conversation records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates a new, unsaved conversation.
    pub fn create(&self) -> Conversation {
        Conversation::new()
    }

    /// Persists the full conversation, replacing any previous version.
    pub fn save(&self, conversation: &Conversation) -> Result<(), StorageError> {
        validate_record_name(KIND, &conversation.id)?;
        let path = self.record_path(&conversation.id);

        let json = serde_json::to_vec_pretty(conversation)
            .map_err(|e| StorageError::Invalid(format!("Failed to serialize conversation: {e}")))?;
        write_atomic(&path, &json).map_err(|e| StorageError::io(&path, e))?;

        tracing::debug!(
            "Saved conversation {} ({} messages)",
            conversation.id,
            conversation.messages().len()
        );
        Ok(())
    }

    /// Loads a conversation by its full identifier.
    pub fn load(&self, id: &str) -> Result<Conversation, StorageError> {
        validate_record_name(KIND, id)?;
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound {
                kind: KIND,
                name: id.to_string(),
            });
        }
        read_record(&path)
    }

    /// Returns true if a record exists for `id`.
    pub fn exists(&self, id: &str) -> bool {
        validate_record_name(KIND, id).is_ok() && self.record_path(id).exists()
    }

    /// Removes a conversation record.
    pub fn delete(&self, id: &str) -> Result<(), StorageError> {
        validate_record_name(KIND, id)?;
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound {
                kind: KIND,
                name: id.to_string(),
            });
        }
        std::fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
        tracing::debug!("Deleted conversation {id}");
        Ok(())
    }

    /// Iterates over stored conversations, reading one record per step.
    ///
    /// Records come in file-name order. Each item is either a conversation
    /// or the error for that single record.
    pub fn records(&self) -> Result<Records, StorageError> {
        Ok(Records {
            paths: self.record_paths()?.into_iter(),
        })
    }

    /// Lists conversation summaries, newest first.
    ///
    /// Unreadable records are reported in [`Listing::skipped`].
    pub fn list(&self) -> Result<Listing, StorageError> {
        let mut listing = Listing::default();

        for (path, record) in self.records()?.with_paths() {
            match record {
                Ok(conversation) => listing.conversations.push(conversation.summary()),
                Err(e) => {
                    tracing::warn!("Skipping unreadable record {}: {}", path.display(), e);
                    listing.skipped.push(SkippedRecord {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        listing
            .conversations
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(listing)
    }

    /// Loads the most recently modified conversation.
    pub fn most_recent(&self) -> Result<Conversation, StorageError> {
        let listing = self.list()?;
        match listing.conversations.first() {
            Some(summary) => self.load(&summary.id),
            None => Err(StorageError::NotFound {
                kind: KIND,
                name: LAST.to_string(),
            }),
        }
    }

    /// Resolves a user-supplied reference to a full conversation id.
    ///
    /// Accepts a full id, a unique id prefix, or `last`.
    pub fn resolve(&self, reference: &str) -> Result<String, StorageError> {
        if reference == LAST {
            return self.most_recent().map(|c| c.id);
        }
        if self.exists(reference) {
            return Ok(reference.to_string());
        }

        let mut matching: Vec<String> = self
            .record_paths()?
            .iter()
            .filter_map(|p| record_id(p))
            .filter(|id| id.starts_with(reference))
            .collect();

        match matching.len() {
            0 => Err(StorageError::NotFound {
                kind: KIND,
                name: reference.to_string(),
            }),
            1 => Ok(matching.remove(0)),
            _ => {
                let short: Vec<String> = matching
                    .iter()
                    .map(|id| id.chars().take(8).collect())
                    .collect();
                Err(StorageError::Invalid(format!(
                    "Ambiguous conversation prefix '{}'. Matches: {}",
                    reference,
                    short.join(", ")
                )))
            }
        }
    }

    /// Case-insensitive substring search over message content and tags.
    ///
    /// Records are scanned one at a time; only matching summaries are kept.
    pub fn search(&self, query: &str) -> Result<SearchResults, StorageError> {
        let needle = lowercase(query.trim());
        if needle.is_empty() {
            return Err(StorageError::Invalid("Search query is empty".to_string()));
        }

        let mut results = SearchResults::default();
        for (path, record) in self.records()?.with_paths() {
            match record {
                Ok(conversation) => {
                    if let Some(hit) = match_conversation(&conversation, &needle) {
                        results.hits.push(hit);
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable record {}: {}", path.display(), e);
                    results.skipped.push(SkippedRecord {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        results
            .hits
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(results)
    }

    /// Adds a tag to a stored conversation.
    ///
    /// Returns false if the conversation already had the tag; nothing is
    /// written in that case.
    pub fn tag(&self, id: &str, tag: &str) -> Result<bool, StorageError> {
        let tag = validate_tag(tag)?;
        let mut conversation = self.load(id)?;
        if !conversation.add_tag(tag) {
            return Ok(false);
        }
        self.save(&conversation)?;
        Ok(true)
    }

    /// Removes a tag from a stored conversation.
    ///
    /// Returns false if the tag was not present.
    pub fn untag(&self, id: &str, tag: &str) -> Result<bool, StorageError> {
        let tag = validate_tag(tag)?;
        let mut conversation = self.load(id)?;
        if !conversation.remove_tag(tag) {
            return Ok(false);
        }
        self.save(&conversation)?;
        Ok(true)
    }

    /// Renders a stored conversation as Markdown.
    pub fn export_markdown(&self, id: &str, redactor: &Redactor) -> Result<String, StorageError> {
        let conversation = self.load(id)?;
        Ok(export::to_markdown(&conversation, redactor))
    }

    /// Renders a stored conversation as pretty JSON.
    pub fn export_json(&self, id: &str, redactor: &Redactor) -> Result<String, StorageError> {
        let conversation = self.load(id)?;
        export::to_json(&conversation, redactor)
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn record_paths(&self) -> Result<Vec<PathBuf>, StorageError> {
        json_records(&self.dir)
    }
}

/// Lazy iterator over stored conversation records.
pub struct Records {
    paths: std::vec::IntoIter<PathBuf>,
}

impl Records {
    /// Pairs each record with the path it was read from.
    pub fn with_paths(self) -> impl Iterator<Item = (PathBuf, Result<Conversation, StorageError>)> {
        self.paths.map(|path| {
            let record = read_record(&path);
            (path, record)
        })
    }
}

impl Iterator for Records {
    type Item = Result<Conversation, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.paths.next().map(|path| read_record(&path))
    }
}

fn record_id(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().to_string())
}

fn read_record(path: &Path) -> Result<Conversation, StorageError> {
    let data = std::fs::read(path).map_err(|e| StorageError::io(path, e))?;
    serde_json::from_slice(&data).map_err(|e| StorageError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn validate_tag(tag: &str) -> Result<&str, StorageError> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(StorageError::Invalid("Tag is empty".to_string()));
    }
    if tag.contains(char::is_control) {
        return Err(StorageError::Invalid(format!(
            "Tag '{}' contains control characters",
            tag.escape_debug()
        )));
    }
    Ok(tag)
}

fn match_conversation(conversation: &Conversation, needle: &str) -> Option<SearchHit> {
    let mut first: Option<(MatchLocation, String)> = None;
    let mut match_count = 0;

    for (index, message) in conversation.messages().iter().enumerate() {
        let Some(found) = find_ignore_case(&message.content, needle) else {
            continue;
        };
        match_count += found.count;
        if first.is_none() {
            first = Some((
                MatchLocation::Message {
                    index,
                    role: message.role,
                },
                excerpt(&message.content, found.start, found.end),
            ));
        }
    }

    for tag in conversation.tags() {
        if let Some(found) = find_ignore_case(tag, needle) {
            match_count += found.count;
            if first.is_none() {
                first = Some((MatchLocation::Tag { tag: tag.clone() }, tag.clone()));
            }
        }
    }

    first.map(|(location, excerpt)| SearchHit {
        id: conversation.id.clone(),
        updated_at: conversation.updated_at,
        location,
        excerpt,
        match_count,
    })
}

/// First case-insensitive match, as byte offsets into the original text.
struct Found {
    start: usize,
    end: usize,
    count: usize,
}

/// Lowercases one character at a time, without the context-sensitive
/// final sigma rule of `str::to_lowercase`, so needle and haystack agree.
fn lowercase(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// Finds `needle` (lowered with [`lowercase`]) in `haystack` ignoring case.
///
/// Lowercasing can change byte lengths, so every byte of the lowered text
/// remembers the start of the original character it came from.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<Found> {
    let mut lowered = String::with_capacity(haystack.len());
    let mut origin: Vec<usize> = Vec::with_capacity(haystack.len());

    for (idx, ch) in haystack.char_indices() {
        for lower in ch.to_lowercase() {
            lowered.push(lower);
        }
        origin.resize(lowered.len(), idx);
    }

    let pos = lowered.find(needle)?;
    let end_lowered = pos + needle.len();
    let start = origin[pos];
    let end = if end_lowered >= lowered.len() {
        haystack.len()
    } else {
        origin[end_lowered]
    };

    Some(Found {
        start,
        end: end.max(start),
        count: lowered.matches(needle).count(),
    })
}

fn excerpt(text: &str, start: usize, end: usize) -> String {
    let before_all = &text[..start];
    let after_all = &text[end..];

    let before_len = before_all.chars().count();
    let before: String = before_all
        .chars()
        .skip(before_len.saturating_sub(EXCERPT_CONTEXT))
        .collect();
    let after: String = after_all.chars().take(EXCERPT_CONTEXT).collect();

    let mut out = String::new();
    if before_len > EXCERPT_CONTEXT {
        out.push_str("...");
    }
    out.push_str(&before);
    out.push_str(&text[start..end]);
    out.push_str(&after);
    if after_all.chars().count() > EXCERPT_CONTEXT {
        out.push_str("...");
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_store() -> (SessionStore, tempfile::TempDir) {
        let dir = tempdir().expect("Failed to create temp directory");
        let store = SessionStore::open(dir.path().join("history")).expect("Failed to open store");
        (store, dir)
    }

    fn saved_conversation(store: &SessionStore, messages: &[(MessageRole, &str)]) -> Conversation {
        let mut conversation = store.create();
        for (role, content) in messages {
            conversation.push_message(*role, *content);
        }
        store.save(&conversation).expect("Failed to save conversation");
        conversation
    }

    #[test]
    fn test_create_does_not_persist() {
        let (store, _dir) = create_test_store();
        let conversation = store.create();
        assert!(!store.exists(&conversation.id));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let (store, _dir) = create_test_store();
        let mut conversation = store.create();
        conversation.push_message(MessageRole::System, "You are helpful");
        conversation.push_message(MessageRole::User, "Explain lifetimes");
        conversation.push_message(MessageRole::Assistant, "Lifetimes are...");
        conversation.add_tag("rust");
        conversation.set_template("explain");
        store.save(&conversation).unwrap();

        let loaded = store.load(&conversation.id).unwrap();
        assert_eq!(loaded, conversation);
        assert_eq!(loaded.template(), Some("explain"));
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let (store, _dir) = create_test_store();
        let err = store.load("does-not-exist").unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn test_load_rejects_path_traversal() {
        let (store, _dir) = create_test_store();
        let err = store.load("../secrets").unwrap_err();
        assert!(matches!(err, StorageError::Invalid(_)));
    }

    #[test]
    fn test_load_corrupted_record_is_left_in_place() {
        let (store, _dir) = create_test_store();
        let path = store.dir().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = store.load("broken").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
        assert!(path.exists(), "Corrupted record should not be deleted");
    }

    #[test]
    fn test_list_orders_newest_first_and_skips_corrupt() {
        let (store, _dir) = create_test_store();
        let older = saved_conversation(&store, &[(MessageRole::User, "first")]);
        let mut newer = saved_conversation(&store, &[(MessageRole::User, "second")]);
        newer.updated_at = older.updated_at + chrono::Duration::seconds(10);
        store.save(&newer).unwrap();
        std::fs::write(store.dir().join("zzz.json"), "garbage").unwrap();

        let listing = store.list().unwrap();
        let ids: Vec<&str> = listing.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
        assert_eq!(listing.skipped.len(), 1);
        assert!(listing.skipped[0].path.ends_with("zzz.json"));
    }

    #[test]
    fn test_list_is_restartable() {
        let (store, _dir) = create_test_store();
        saved_conversation(&store, &[(MessageRole::User, "a")]);
        saved_conversation(&store, &[(MessageRole::User, "b")]);

        let first: Vec<String> = store.list().unwrap().iter().map(|s| s.id.clone()).collect();
        let second: Vec<String> = store.list().unwrap().iter().map(|s| s.id.clone()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_most_recent() {
        let (store, _dir) = create_test_store();
        let a = saved_conversation(&store, &[(MessageRole::User, "a")]);
        let mut b = saved_conversation(&store, &[(MessageRole::User, "b")]);
        b.updated_at = a.updated_at + chrono::Duration::minutes(1);
        store.save(&b).unwrap();

        assert_eq!(store.most_recent().unwrap().id, b.id);
    }

    #[test]
    fn test_most_recent_empty_store() {
        let (store, _dir) = create_test_store();
        assert!(matches!(
            store.most_recent().unwrap_err(),
            StorageError::NotFound { .. }
        ));
    }

    #[test]
    fn test_resolve_prefix_and_last() {
        let (store, _dir) = create_test_store();
        let conversation = saved_conversation(&store, &[(MessageRole::User, "a")]);

        assert_eq!(store.resolve(&conversation.id).unwrap(), conversation.id);
        assert_eq!(store.resolve(&conversation.id[..8]).unwrap(), conversation.id);
        assert_eq!(store.resolve(LAST).unwrap(), conversation.id);
        assert!(matches!(
            store.resolve("zzzz").unwrap_err(),
            StorageError::NotFound { .. }
        ));
    }

    #[test]
    fn test_resolve_ambiguous_prefix() {
        let (store, _dir) = create_test_store();
        let mut a = store.create();
        a.id = "abc-one".to_string();
        let mut b = store.create();
        b.id = "abc-two".to_string();
        store.save(&a).unwrap();
        store.save(&b).unwrap();

        let err = store.resolve("abc").unwrap_err();
        assert!(err.to_string().contains("Ambiguous"));
    }

    #[test]
    fn test_search_finds_message_content() {
        let (store, _dir) = create_test_store();
        let conversation = saved_conversation(
            &store,
            &[(MessageRole::User, "intelligence artificielle est fascinante")],
        );
        saved_conversation(&store, &[(MessageRole::User, "unrelated")]);

        let results = store.search("intelligence").unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0].id, conversation.id);
        assert!(results.hits[0].excerpt.contains("intelligence"));

        assert!(store.search("ZZZ-not-present").unwrap().hits.is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let (store, _dir) = create_test_store();
        saved_conversation(&store, &[(MessageRole::Assistant, "Use GIT REBASE carefully")]);

        let results = store.search("git rebase").unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(
            results.hits[0].location,
            MatchLocation::Message {
                index: 0,
                role: MessageRole::Assistant
            }
        );
        assert!(results.hits[0].excerpt.contains("GIT REBASE"));
    }

    #[test]
    fn test_search_matches_tags() {
        let (store, _dir) = create_test_store();
        let mut conversation = saved_conversation(&store, &[(MessageRole::User, "hello")]);
        conversation.add_tag("Deployment");
        store.save(&conversation).unwrap();

        let results = store.search("deploy").unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(
            results.hits[0].location,
            MatchLocation::Tag {
                tag: "Deployment".to_string()
            }
        );
    }

    #[test]
    fn test_search_skips_corrupted_records() {
        let (store, _dir) = create_test_store();
        saved_conversation(&store, &[(MessageRole::User, "needle here")]);
        std::fs::write(store.dir().join("bad.json"), "[1, 2").unwrap();

        let results = store.search("needle").unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.skipped.len(), 1);
    }

    #[test]
    fn test_search_empty_query_rejected() {
        let (store, _dir) = create_test_store();
        assert!(matches!(
            store.search("   ").unwrap_err(),
            StorageError::Invalid(_)
        ));
    }

    #[test]
    fn test_tag_is_idempotent() {
        let (store, _dir) = create_test_store();
        let conversation = saved_conversation(&store, &[(MessageRole::User, "a")]);

        assert!(store.tag(&conversation.id, "bug").unwrap());
        let after_first = store.load(&conversation.id).unwrap();
        assert!(!store.tag(&conversation.id, "bug").unwrap());
        let after_second = store.load(&conversation.id).unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(after_second.tags().len(), 1);
    }

    #[test]
    fn test_untag() {
        let (store, _dir) = create_test_store();
        let conversation = saved_conversation(&store, &[(MessageRole::User, "a")]);
        store.tag(&conversation.id, "wip").unwrap();

        assert!(store.untag(&conversation.id, "wip").unwrap());
        assert!(!store.untag(&conversation.id, "wip").unwrap());
        assert!(store.load(&conversation.id).unwrap().tags().is_empty());
    }

    #[test]
    fn test_tag_rejects_empty_label() {
        let (store, _dir) = create_test_store();
        let conversation = saved_conversation(&store, &[(MessageRole::User, "a")]);
        assert!(store.tag(&conversation.id, "  ").is_err());
    }

    #[test]
    fn test_delete() {
        let (store, _dir) = create_test_store();
        let conversation = saved_conversation(&store, &[(MessageRole::User, "a")]);
        store.delete(&conversation.id).unwrap();
        assert!(!store.exists(&conversation.id));
        assert!(store.delete(&conversation.id).is_err());
    }

    #[test]
    fn test_find_ignore_case_multibyte() {
        let found = find_ignore_case("Crème BRÛLÉE", "brûlée").unwrap();
        assert_eq!(&"Crème BRÛLÉE"[found.start..found.end], "BRÛLÉE");
        assert_eq!(found.count, 1);
    }

    #[test]
    fn test_search_matches_final_sigma() {
        let (store, _dir) = create_test_store();
        saved_conversation(&store, &[(MessageRole::User, "ΟΔΥΣΣΕΥΣ returns")]);

        let results = store.search("ΟΔΥΣΣΕΥΣ").unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0].match_count, 1);
    }

    #[test]
    fn test_excerpt_truncates_context() {
        let text = format!("{}needle{}", "a".repeat(100), "b".repeat(100));
        let start = 100;
        let end = 106;
        let result = excerpt(&text, start, end);
        assert!(result.starts_with("..."));
        assert!(result.ends_with("..."));
        assert!(result.contains("needle"));
    }
}
