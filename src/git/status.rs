//! Working tree status and stash listings.

use serde::Serialize;

use super::inspector::{GitBackend, GitRequest};
use super::GitError;

/// Snapshot of `git status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkingTreeStatus {
    /// Current branch, `None` when HEAD is detached
    pub branch: Option<String>,
    pub upstream: Option<String>,
    pub ahead: usize,
    pub behind: usize,
    pub staged: Vec<String>,
    pub modified: Vec<String>,
    pub untracked: Vec<String>,
    pub conflicted: Vec<String>,
}

impl WorkingTreeStatus {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty()
            && self.modified.is_empty()
            && self.untracked.is_empty()
            && self.conflicted.is_empty()
    }
}

/// Parses `git status --porcelain=v1 --branch` output.
pub fn parse_status(output: &str) -> WorkingTreeStatus {
    let mut status = WorkingTreeStatus::default();

    for line in output.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            parse_branch_header(header, &mut status);
            continue;
        }
        if line.len() < 4 {
            continue;
        }

        let (code, path) = line.split_at(2);
        let path = path.trim_start();
        // Renames are reported as "old -> new"
        let path = path.rsplit(" -> ").next().unwrap_or(path).to_string();

        let mut codes = code.chars();
        let index = codes.next().unwrap_or(' ');
        let worktree = codes.next().unwrap_or(' ');

        match (index, worktree) {
            ('?', '?') => status.untracked.push(path),
            ('!', '!') => {}
            ('U', _) | (_, 'U') | ('A', 'A') | ('D', 'D') => status.conflicted.push(path),
            _ => {
                if index != ' ' {
                    status.staged.push(path.clone());
                }
                if worktree != ' ' {
                    status.modified.push(path);
                }
            }
        }
    }

    status
}

fn parse_branch_header(header: &str, status: &mut WorkingTreeStatus) {
    let (refs, tracking) = match header.split_once(" [") {
        Some((refs, rest)) => (refs, rest.trim_end_matches(']')),
        None => (header, ""),
    };

    if let Some(unborn) = refs.strip_prefix("No commits yet on ") {
        status.branch = Some(unborn.to_string());
    } else if !refs.starts_with("HEAD (no branch)") {
        match refs.split_once("...") {
            Some((branch, upstream)) => {
                status.branch = Some(branch.to_string());
                status.upstream = Some(upstream.to_string());
            }
            None => status.branch = Some(refs.to_string()),
        }
    }

    for part in tracking.split(", ") {
        if let Some(n) = part.strip_prefix("ahead ") {
            status.ahead = n.parse().unwrap_or(0);
        } else if let Some(n) = part.strip_prefix("behind ") {
            status.behind = n.parse().unwrap_or(0);
        }
    }
}

/// One entry of `git stash list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StashEntry {
    pub index: usize,
    pub description: String,
}

/// Parses `git stash list` output, skipping unrecognized lines.
pub fn parse_stash_list(output: &str) -> Vec<StashEntry> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix("stash@{")?;
            let (index, description) = rest.split_once("}:")?;
            Some(StashEntry {
                index: index.parse().ok()?,
                description: description.trim().to_string(),
            })
        })
        .collect()
}

pub fn status(backend: &dyn GitBackend) -> Result<WorkingTreeStatus, GitError> {
    Ok(parse_status(&backend.run(&GitRequest::Status)?.stdout))
}

pub fn stash_list(backend: &dyn GitBackend) -> Result<Vec<StashEntry>, GitError> {
    Ok(parse_stash_list(&backend.run(&GitRequest::StashList)?.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        let output = [
            "## main...origin/main [ahead 2, behind 1]",
            "M  src/staged.rs",
            " M src/modified.rs",
            "MM src/both.rs",
            "?? notes.txt",
            "UU src/conflict.rs",
            "AA both_added.rs",
            "R  old.rs -> new.rs",
        ]
        .join("\n");

        let status = parse_status(&output);
        assert_eq!(status.branch.as_deref(), Some("main"));
        assert_eq!(status.upstream.as_deref(), Some("origin/main"));
        assert_eq!(status.ahead, 2);
        assert_eq!(status.behind, 1);
        assert_eq!(status.staged, vec!["src/staged.rs", "src/both.rs", "new.rs"]);
        assert_eq!(status.modified, vec!["src/modified.rs", "src/both.rs"]);
        assert_eq!(status.untracked, vec!["notes.txt"]);
        assert_eq!(status.conflicted, vec!["src/conflict.rs", "both_added.rs"]);
        assert!(!status.is_clean());
    }

    #[test]
    fn test_parse_clean_status() {
        let status = parse_status("## feature/login\n");
        assert_eq!(status.branch.as_deref(), Some("feature/login"));
        assert!(status.upstream.is_none());
        assert!(status.is_clean());
    }

    #[test]
    fn test_parse_detached_and_unborn() {
        assert!(parse_status("## HEAD (no branch)\n").branch.is_none());
        assert_eq!(
            parse_status("## No commits yet on main\n").branch.as_deref(),
            Some("main")
        );
    }

    #[test]
    fn test_parse_stash_list() {
        let output = "stash@{0}: WIP on main: abc1234 fix parser\n\
                      stash@{1}: On dev: experiment\n\
                      garbage line\n";
        let entries = parse_stash_list(output);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].index, 0);
        assert_eq!(entries[0].description, "WIP on main: abc1234 fix parser");
        assert_eq!(entries[1].index, 1);
        assert_eq!(entries[1].description, "On dev: experiment");
    }
}
