//! CLI commands for bocode.
//!
//! Each submodule implements a single CLI command with its argument
//! parsing and execution logic.

/// Append a message to a conversation.
pub mod append;

/// Shell completion scripts.
pub mod completions;

/// Configuration viewing and management.
pub mod config;

/// Delete a conversation.
pub mod delete;

/// Export a conversation with optional redaction.
pub mod export;

/// Repository inspection and analysis.
pub mod git;

/// Start a conversation.
pub mod new;

/// Case-insensitive search over conversations.
pub mod search;

/// List conversations.
pub mod sessions;

/// Display a conversation.
pub mod show;

/// Add and remove tags.
pub mod tag;

/// Prompt template management.
pub mod template;
