//! Git integration.
//!
//! [`inspector`] is the only code that talks to the git executable. Every
//! other module here works on the raw text it returns, so each analysis
//! can be driven by canned output through the [`GitBackend`] trait.

pub mod classify;
pub mod conflict;
pub mod graph;
pub mod inspector;
pub mod log;
pub mod retro;
pub mod status;

use std::path::PathBuf;

pub use classify::{CommitCategory, CommitClassifier};
pub use conflict::{ConflictAnalyzer, ConflictHunk, ConflictThresholds, ConflictType};
pub use graph::{LogGraph, LogGraphRenderer};
pub use inspector::{DiffTarget, GitBackend, GitInspector, GitOutput, GitRequest, LogFormat, LogQuery};
pub use log::{CommitRecord, ParsedLog};
pub use retro::{RetrospectiveAggregator, RetrospectivePeriod};

/// Errors raised while invoking git or validating a git request.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// The path is not inside a git working tree.
    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// The git executable could not be started.
    #[error("git executable '{0}' not found. Install git or add it to PATH.")]
    BinaryNotFound(String),

    /// git ran and exited unsuccessfully.
    #[error("`git {command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// Spawning or reading from git failed.
    #[error("Failed to run git: {0}")]
    Io(#[from] std::io::Error),

    /// A request argument was rejected before running git.
    #[error("Invalid git argument: {0}")]
    InvalidArgument(String),

    /// The retrospective window is outside the accepted range.
    #[error("Retrospective window must be between 1 and {max} days, got {days}")]
    InvalidWindow { days: i64, max: i64 },
}

impl GitError {
    /// Short machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            GitError::NotARepository(_) => "not-a-repository",
            GitError::BinaryNotFound(_) => "binary-not-found",
            GitError::CommandFailed { .. } | GitError::Io(_) => "command-failed",
            GitError::InvalidArgument(_) | GitError::InvalidWindow { .. } => "invalid-request",
        }
    }
}
