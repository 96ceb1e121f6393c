//! Core data models for conversations.
//!
//! A conversation is the unit of persisted chat state. Messages are
//! append-only: once pushed they can be read but never edited, and the
//! order they were pushed in is the conversational order.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current on-disk record version.
pub const RECORD_VERSION: u32 = 1;

/// Title shown for conversations without a user message.
const UNTITLED: &str = "Untitled conversation";

/// Maximum title length in characters.
const TITLE_LEN: usize = 50;

fn record_version() -> u32 {
    RECORD_VERSION
}

/// A persisted, ordered exchange between a user and the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Record format version, for forward-compatible reads
    #[serde(default = "record_version")]
    pub version: u32,

    /// Unique identifier (also the record's file stem)
    pub id: String,

    /// When the conversation was created
    pub created_at: DateTime<Utc>,

    /// When the conversation was last changed
    pub updated_at: DateTime<Utc>,

    /// Free-form labels
    #[serde(default)]
    tags: BTreeSet<String>,

    /// Template the conversation was started from
    #[serde(default)]
    template: Option<String>,

    /// Messages in conversational order
    #[serde(default)]
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation with a fresh identifier.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: RECORD_VERSION,
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            tags: BTreeSet::new(),
            template: None,
            messages: Vec::new(),
        }
    }

    /// Messages in the order they were appended.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Tags in sorted order.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Name of the template this conversation was started from.
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Appends a message stamped with the current time.
    pub fn push_message(&mut self, role: MessageRole, content: impl Into<String>) -> &Message {
        let message = Message::new(role, content);
        self.updated_at = message.timestamp.max(self.updated_at);
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Adds a tag. Returns false if the tag was already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let added = self.tags.insert(tag.to_string());
        if added {
            self.touch();
        }
        added
    }

    /// Removes a tag. Returns false if the tag was not present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let removed = self.tags.remove(tag);
        if removed {
            self.touch();
        }
        removed
    }

    /// Associates the conversation with a template name.
    pub fn set_template(&mut self, name: impl Into<String>) {
        self.template = Some(name.into());
        self.touch();
    }

    /// Builds the listing summary for this conversation.
    pub fn summary(&self) -> ConversationSummary {
        let title = self
            .messages
            .iter()
            .find(|m| m.role == MessageRole::User)
            .map(|m| truncate_title(&m.content))
            .unwrap_or_else(|| UNTITLED.to_string());

        ConversationSummary {
            id: self.id.clone(),
            title,
            tags: self.tags.clone(),
            message_count: self.messages.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_title(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() <= TITLE_LEN {
        first_line.to_string()
    } else {
        let head: String = first_line.chars().take(TITLE_LEN).collect();
        format!("{head}...")
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: MessageRole,

    /// The message text
    pub content: String,

    /// When this message was appended
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// A human user message.
    User,
    /// An assistant response.
    Assistant,
    /// A system prompt or instruction.
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Listing entry for a stored conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Buffers a streamed assistant reply until it is complete.
///
/// Chunks accumulate here instead of in the conversation. Only
/// [`PendingResponse::commit`] appends the text, so dropping the buffer on
/// interrupt leaves the conversation exactly as it was.
#[derive(Debug, Default)]
pub struct PendingResponse {
    buffer: String,
}

impl PendingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a streamed chunk.
    pub fn push_chunk(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
    }

    /// Text received so far.
    pub fn partial(&self) -> &str {
        &self.buffer
    }

    /// Appends the complete reply to the conversation as an assistant message.
    pub fn commit(self, conversation: &mut Conversation) -> &Message {
        conversation.push_message(MessageRole::Assistant, self.buffer)
    }
}
