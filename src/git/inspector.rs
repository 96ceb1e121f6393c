//! Read-mostly access to a git working tree.
//!
//! Requests form a closed set ([`GitRequest`]); there is no way to pass an
//! arbitrary argument list to git. [`GitInspector`] runs them against the
//! git executable, and tests substitute their own [`GitBackend`].

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use chrono::{DateTime, SecondsFormat, Utc};

use super::GitError;

/// Pretty format for commit records parsed by [`super::log::parse_log`].
///
/// Each record starts with a record separator and its fields are split by
/// unit separators. Changed files follow the final separator.
pub const RECORD_FORMAT: &str = "%x1e%H%x1f%an <%ae>%x1f%aI%x1f%B%x1f";

/// Pretty format for graph rows parsed by [`super::graph::LogGraph::parse`].
pub const GRAPH_FORMAT: &str = "%h%x1f%p%x1f%d%x1f%s";

/// Pretty format for human-readable one-line listings.
pub const ONELINE_FORMAT: &str = "%h %ad%d %s [%an]";

/// How log output is shaped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Machine-readable records with changed file names
    #[default]
    Records,
    /// Topology-annotated rows for the graph renderer
    Graph,
    /// One line per commit for display
    Oneline,
}

/// Parameters of a `git log` request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub format: LogFormat,
    /// Maximum number of commits
    pub count: Option<usize>,
    /// Only commits authored after this instant
    pub since: Option<DateTime<Utc>>,
    /// Only commits whose author matches this pattern
    pub author: Option<String>,
    /// Walk every ref instead of HEAD only
    pub all_refs: bool,
}

impl LogQuery {
    pub fn records() -> Self {
        Self::default()
    }

    pub fn graph() -> Self {
        Self {
            format: LogFormat::Graph,
            ..Self::default()
        }
    }

    pub fn oneline() -> Self {
        Self {
            format: LogFormat::Oneline,
            ..Self::default()
        }
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn all_refs(mut self, all: bool) -> Self {
        self.all_refs = all;
        self
    }
}

/// What a diff compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffTarget {
    /// Unstaged changes in the working tree
    WorkingTree,
    /// Staged changes against HEAD
    Staged,
    /// Working tree against a revision
    Revision(String),
    /// Two revisions against each other
    Range(String, String),
}

/// The closed set of git operations the assistant may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRequest {
    Status,
    Log(LogQuery),
    Diff { target: DiffTarget, stat: bool },
    StashList,
    StashCreate { message: Option<String> },
    StashApply { index: usize },
    MergeBase { left: String, right: String },
    ConflictedFiles,
}

impl GitRequest {
    /// Builds the argument list passed to git.
    ///
    /// Revision arguments are rejected when they could be read as options.
    pub fn args(&self) -> Result<Vec<String>, GitError> {
        let args: Vec<String> = match self {
            GitRequest::Status => vec!["status".into(), "--porcelain=v1".into(), "--branch".into()],
            GitRequest::Log(query) => log_args(query)?,
            GitRequest::Diff { target, stat } => {
                let mut args = vec!["diff".to_string()];
                if *stat {
                    args.push("--stat".into());
                }
                match target {
                    DiffTarget::WorkingTree => {}
                    DiffTarget::Staged => args.push("--cached".into()),
                    DiffTarget::Revision(rev) => args.push(checked_revision(rev)?.into()),
                    DiffTarget::Range(from, to) => {
                        args.push(checked_revision(from)?.into());
                        args.push(checked_revision(to)?.into());
                    }
                }
                args.push("--".into());
                args
            }
            GitRequest::StashList => vec!["stash".into(), "list".into()],
            GitRequest::StashCreate { message } => {
                let mut args = vec!["stash".to_string(), "push".to_string()];
                if let Some(message) = message {
                    args.push("--message".into());
                    args.push(message.clone());
                }
                args
            }
            GitRequest::StashApply { index } => {
                vec!["stash".into(), "apply".into(), format!("stash@{{{index}}}")]
            }
            GitRequest::MergeBase { left, right } => vec![
                "merge-base".into(),
                checked_revision(left)?.into(),
                checked_revision(right)?.into(),
            ],
            GitRequest::ConflictedFiles => vec![
                "diff".into(),
                "--name-only".into(),
                "--diff-filter=U".into(),
            ],
        };
        Ok(args)
    }
}

fn log_args(query: &LogQuery) -> Result<Vec<String>, GitError> {
    let mut args = vec!["log".to_string()];
    match query.format {
        LogFormat::Records => {
            args.push(format!("--pretty=format:{RECORD_FORMAT}"));
            args.push("--name-only".into());
        }
        LogFormat::Graph => {
            args.push("--graph".into());
            args.push(format!("--pretty=format:{GRAPH_FORMAT}"));
        }
        LogFormat::Oneline => {
            args.push(format!("--pretty=format:{ONELINE_FORMAT}"));
            args.push("--date=short".into());
        }
    }
    if let Some(count) = query.count {
        args.push(format!("--max-count={count}"));
    }
    if let Some(since) = query.since {
        args.push(format!(
            "--since={}",
            since.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    if let Some(author) = &query.author {
        if author.is_empty() {
            return Err(GitError::InvalidArgument("author filter is empty".into()));
        }
        args.push(format!("--author={author}"));
    }
    if query.all_refs {
        args.push("--all".into());
    }
    Ok(args)
}

fn checked_revision(rev: &str) -> Result<&str, GitError> {
    if rev.is_empty() || rev.starts_with('-') || rev.chars().any(char::is_whitespace) {
        return Err(GitError::InvalidArgument(format!("'{rev}' is not a revision")));
    }
    Ok(rev)
}

/// Raw result of a git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

/// Something that can answer [`GitRequest`]s for one working tree.
pub trait GitBackend {
    /// Root of the working tree.
    fn workdir(&self) -> &Path;

    /// Runs a request, failing on a non-zero exit.
    fn run(&self, request: &GitRequest) -> Result<GitOutput, GitError>;

    /// Whether `git log` has anything to walk.
    ///
    /// False when HEAD is an unborn branch, unless `all_refs` is set and
    /// some other ref exists.
    fn has_commits(&self, _all_refs: bool) -> bool {
        true
    }

    /// Reads a file relative to the working tree.
    fn read_file(&self, relative: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(self.workdir().join(relative))
    }
}

/// Runs requests with the git executable inside a discovered repository.
#[derive(Debug)]
pub struct GitInspector {
    workdir: PathBuf,
    binary: PathBuf,
}

impl GitInspector {
    /// Discovers the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::NotARepository`] when no working tree encloses
    /// `path`. Bare repositories count as not a repository.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path)
            .map_err(|_| GitError::NotARepository(path.to_path_buf()))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::NotARepository(path.to_path_buf()))?
            .to_path_buf();

        tracing::debug!("Discovered repository at {}", workdir.display());
        Ok(Self {
            workdir,
            binary: PathBuf::from("git"),
        })
    }

    /// Uses a different git executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Current branch name, if HEAD points to a branch.
    pub fn current_branch(&self) -> Option<String> {
        let repo = git2::Repository::open(&self.workdir).ok()?;
        let head = repo.head().ok()?;
        if !head.is_branch() {
            return None;
        }
        head.shorthand().map(|s| s.to_string())
    }
}

fn unborn_head(repo: &git2::Repository) -> bool {
    matches!(repo.head(), Err(e) if e.code() == git2::ErrorCode::UnbornBranch)
}

impl GitBackend for GitInspector {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn has_commits(&self, all_refs: bool) -> bool {
        // Anything unexpected is left for git itself to report.
        let Ok(repo) = git2::Repository::open(&self.workdir) else {
            return true;
        };
        if !unborn_head(&repo) {
            return true;
        }
        all_refs
            && repo
                .references()
                .map(|mut refs| refs.next().is_some())
                .unwrap_or(false)
    }

    fn run(&self, request: &GitRequest) -> Result<GitOutput, GitError> {
        let args = request.args()?;
        let command = args.join(" ");
        tracing::debug!("Running git {command}");

        let output = Command::new(&self.binary)
            .args(["-c", "color.ui=false", "-c", "core.quotepath=false"])
            .args(&args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GitError::BinaryNotFound(self.binary.display().to_string())
                } else {
                    GitError::Io(e)
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            tracing::debug!("git {command} failed: {stderr}");
            return Err(GitError::CommandFailed {
                command,
                status: describe_status(output.status),
                stderr,
            });
        }

        Ok(GitOutput {
            stdout,
            stderr,
            code: output.status.code().unwrap_or(0),
        })
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
