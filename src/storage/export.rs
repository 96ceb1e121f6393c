//! Conversation export with optional redaction.
//!
//! Renders a conversation as Markdown or JSON. Exports are pure functions
//! of the stored record; redaction applies to message content only.

use regex::Regex;
use serde::Serialize;

use super::models::{Conversation, MessageRole};
use super::StorageError;

/// Replacement text for redacted spans.
const REDACTED: &str = "[REDACTED]";

/// Handles redaction of sensitive data.
#[derive(Debug, Default)]
pub struct Redactor {
    patterns: Vec<Regex>,
}

impl Redactor {
    /// A redactor that leaves text untouched.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a redactor with optional built-in and custom patterns.
    pub fn new(use_builtin: bool, custom_patterns: &[String]) -> Result<Self, StorageError> {
        let mut sources: Vec<String> = Vec::new();

        if use_builtin {
            sources.extend(
                [
                    // API keys and tokens
                    r#"(?i)(api[_-]?key|apikey|api_secret)[=:\s]+['"]?[\w\-]{16,}['"]?"#,
                    r"(?i)Bearer\s+[\w\-\.]{16,}",
                    r"sk-[a-zA-Z0-9\-_]{20,}",
                    r#"(?i)(secret|password|passwd|pwd)[=:\s]+['"]?[^\s'"]{8,}['"]?"#,
                    // Cloud and forge credentials
                    r"AKIA[0-9A-Z]{16}",
                    r"gh[pousr]_[a-zA-Z0-9]{36}",
                    // Email addresses
                    r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}",
                    // Private keys
                    r"-----BEGIN [A-Z ]+ PRIVATE KEY-----[\s\S]*?-----END [A-Z ]+ PRIVATE KEY-----",
                    // Connection strings
                    r"(?i)(mysql|postgres|postgresql|mongodb|redis)://[^\s]+",
                ]
                .iter()
                .map(|s| s.to_string()),
            );
        }
        sources.extend(custom_patterns.iter().cloned());

        let patterns = sources
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| StorageError::Invalid(format!("Invalid regex pattern '{p}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Redacts sensitive data from the given text.
    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();
        for pattern in &self.patterns {
            result = pattern.replace_all(&result, REDACTED).to_string();
        }
        result
    }
}

/// Label used for a role in exported documents.
fn role_heading(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "User",
        MessageRole::Assistant => "Assistant",
        MessageRole::System => "System",
    }
}

/// Renders the conversation as a Markdown document, messages in order.
pub fn to_markdown(conversation: &Conversation, redactor: &Redactor) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Conversation {}\n\n", conversation.id));

    output.push_str("| Property | Value |\n");
    output.push_str("|----------|-------|\n");
    output.push_str(&format!(
        "| Created | {} |\n",
        conversation.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!(
        "| Updated | {} |\n",
        conversation.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("| Messages | {} |\n", conversation.messages().len()));
    if let Some(template) = conversation.template() {
        output.push_str(&format!("| Template | `{template}` |\n"));
    }
    output.push('\n');

    if !conversation.tags().is_empty() {
        output.push_str("## Tags\n\n");
        for tag in conversation.tags() {
            output.push_str(&format!("- {tag}\n"));
        }
        output.push('\n');
    }

    output.push_str("## Conversation\n\n");
    for message in conversation.messages() {
        let time = message.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        output.push_str(&format!("### [{}] {time}\n\n", role_heading(message.role)));
        output.push_str(&redactor.redact(&message.content));
        output.push_str("\n\n");
    }

    output
}

#[derive(Serialize)]
struct ExportedConversation<'a> {
    id: &'a str,
    created_at: String,
    updated_at: String,
    template: Option<&'a str>,
    tags: Vec<&'a str>,
    messages: Vec<ExportedMessage>,
}

#[derive(Serialize)]
struct ExportedMessage {
    index: usize,
    timestamp: String,
    role: String,
    content: String,
}

/// Renders the conversation as pretty JSON.
pub fn to_json(conversation: &Conversation, redactor: &Redactor) -> Result<String, StorageError> {
    let exported = ExportedConversation {
        id: &conversation.id,
        created_at: conversation.created_at.to_rfc3339(),
        updated_at: conversation.updated_at.to_rfc3339(),
        template: conversation.template(),
        tags: conversation.tags().iter().map(String::as_str).collect(),
        messages: conversation
            .messages()
            .iter()
            .enumerate()
            .map(|(index, m)| ExportedMessage {
                index,
                timestamp: m.timestamp.to_rfc3339(),
                role: m.role.to_string(),
                content: redactor.redact(&m.content),
            })
            .collect(),
    };

    serde_json::to_string_pretty(&exported)
        .map_err(|e| StorageError::Invalid(format!("Failed to serialize export: {e}")))
}
