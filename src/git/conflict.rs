//! Merge conflict analysis.
//!
//! Conflict regions are read from marker-annotated file content (or given
//! directly as two sides of a diff) and each region is classified by how
//! far the sides diverge. Classification is a pure function of the two
//! sides and the configured thresholds.

use std::path::Path;

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

use super::inspector::{GitBackend, GitRequest};
use super::GitError;

const OURS_MARKER: &str = "<<<<<<<";
const BASE_MARKER: &str = "|||||||";
const SEPARATOR_MARKER: &str = "=======";
const THEIRS_MARKER: &str = ">>>>>>>";

/// Kind of conflicting change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    /// Only theirs has content
    Addition,
    /// Only ours has content
    Deletion,
    ModificationMinor,
    ModificationMajor,
}

impl ConflictType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictType::Addition => "addition",
            ConflictType::Deletion => "deletion",
            ConflictType::ModificationMinor => "modification-minor",
            ConflictType::ModificationMajor => "modification-major",
        }
    }
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested way to resolve a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    TakeOurs,
    TakeTheirs,
    /// Both sides are equivalent
    Either,
    /// Combine the small edits by hand
    Combine,
    /// The sides diverge; review both
    Review,
}

/// Thresholds separating minor from major modifications.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictThresholds {
    /// Modifications differing in fewer lines than this are minor
    pub minor_max_lines: usize,

    /// Character similarity below which sides with no shared line are major
    pub similarity_floor: f32,
}

impl Default for ConflictThresholds {
    fn default() -> Self {
        Self {
            minor_max_lines: 3,
            similarity_floor: 0.5,
        }
    }
}

/// One classified conflict region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictHunk {
    pub path: String,
    /// 1-based line of the opening marker, 0 for diff pairs
    pub line: usize,
    pub kind: ConflictType,
    pub ours: String,
    pub theirs: String,
    pub ours_label: Option<String>,
    pub theirs_label: Option<String>,
    pub resolution: Resolution,
    pub suggestion: String,
}

/// Conflicts found in a single file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileConflicts {
    pub path: String,
    pub hunks: Vec<ConflictHunk>,
    /// Malformed marker sequences
    pub warnings: Vec<String>,
    /// Set when the file could not be read
    pub error: Option<String>,
}

/// Every conflicted file in a working tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConflictReport {
    pub files: Vec<FileConflicts>,
}

impl ConflictReport {
    pub fn hunk_count(&self) -> usize {
        self.files.iter().map(|f| f.hunks.len()).sum()
    }

    /// git commands that resolve each file by taking a whole side.
    pub fn resolution_commands(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.error.is_none() && !f.hunks.is_empty())
            .filter_map(|f| {
                let first = f.hunks[0].resolution;
                let whole_side = f.hunks.iter().all(|h| h.resolution == first);
                match first {
                    Resolution::TakeOurs if whole_side => {
                        Some(format!("git checkout --ours -- {0} && git add {0}", f.path))
                    }
                    Resolution::TakeTheirs if whole_side => {
                        Some(format!("git checkout --theirs -- {0} && git add {0}", f.path))
                    }
                    _ => None,
                }
            })
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictAnalyzer {
    thresholds: ConflictThresholds,
}

impl ConflictAnalyzer {
    pub fn new(thresholds: ConflictThresholds) -> Self {
        Self { thresholds }
    }

    /// Classifies a pair of competing sides.
    pub fn classify(&self, ours: &str, theirs: &str) -> ConflictType {
        let ours = normalize(ours);
        let theirs = normalize(theirs);

        match (ours.is_empty(), theirs.is_empty()) {
            (true, false) => return ConflictType::Addition,
            (false, true) => return ConflictType::Deletion,
            (true, true) => return ConflictType::ModificationMinor,
            (false, false) => {}
        }

        let (differing, common) = line_changes(&ours, &theirs);
        if differing == 0 {
            return ConflictType::ModificationMinor;
        }
        if common == 0 {
            // A single rewritten line may still be a small edit.
            let single_line = ours.lines().count() == 1 && theirs.lines().count() == 1;
            if !single_line {
                return ConflictType::ModificationMajor;
            }
            let similarity = TextDiff::from_chars(ours.trim(), theirs.trim()).ratio();
            if similarity < self.thresholds.similarity_floor {
                return ConflictType::ModificationMajor;
            }
        }
        if differing < self.thresholds.minor_max_lines {
            ConflictType::ModificationMinor
        } else {
            ConflictType::ModificationMajor
        }
    }

    /// Classifies a pair of diff sides as a single hunk.
    pub fn analyze_sides(&self, path: &str, ours: &str, theirs: &str) -> ConflictHunk {
        self.hunk(path, 0, ours.to_string(), theirs.to_string(), None, None)
    }

    /// Extracts and classifies every marked conflict region in `content`.
    ///
    /// Unterminated regions are reported as warnings; the regions around
    /// them are still analyzed.
    pub fn analyze_content(&self, path: &str, content: &str) -> FileConflicts {
        let mut result = FileConflicts {
            path: path.to_string(),
            ..Default::default()
        };
        let mut open: Option<OpenRegion> = None;

        for (index, line) in content.lines().enumerate() {
            let line_number = index + 1;

            if let Some(label) = marker(line, OURS_MARKER) {
                if let Some(stale) = open.take() {
                    result.warnings.push(stale.unterminated());
                }
                open = Some(OpenRegion::new(line_number, label));
                continue;
            }

            let Some(region) = open.as_mut() else {
                continue;
            };

            match region.section {
                Section::Ours if marker(line, BASE_MARKER).is_some() => {
                    region.section = Section::Base;
                }
                Section::Ours | Section::Base if is_separator(line) => {
                    region.section = Section::Theirs;
                }
                Section::Theirs if marker(line, THEIRS_MARKER).is_some() => {
                    let label = marker(line, THEIRS_MARKER).flatten();
                    if let Some(done) = open.take() {
                        result.hunks.push(self.hunk(
                            path,
                            done.line,
                            done.ours.join("\n"),
                            done.theirs.join("\n"),
                            done.ours_label,
                            label,
                        ));
                    }
                }
                Section::Ours => region.ours.push(line),
                Section::Base => {}
                Section::Theirs => region.theirs.push(line),
            }
        }

        if let Some(stale) = open {
            result.warnings.push(stale.unterminated());
        }
        for warning in &result.warnings {
            tracing::warn!("{path}: {warning}");
        }
        result
    }

    fn hunk(
        &self,
        path: &str,
        line: usize,
        ours: String,
        theirs: String,
        ours_label: Option<String>,
        theirs_label: Option<String>,
    ) -> ConflictHunk {
        let kind = self.classify(&ours, &theirs);
        let (resolution, suggestion) = suggest(kind, &ours, &theirs);
        ConflictHunk {
            path: path.to_string(),
            line,
            kind,
            ours,
            theirs,
            ours_label,
            theirs_label,
            resolution,
            suggestion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Ours,
    Base,
    Theirs,
}

struct OpenRegion<'a> {
    line: usize,
    section: Section,
    ours_label: Option<String>,
    ours: Vec<&'a str>,
    theirs: Vec<&'a str>,
}

impl<'a> OpenRegion<'a> {
    fn new(line: usize, label: Option<String>) -> Self {
        Self {
            line,
            section: Section::Ours,
            ours_label: label,
            ours: Vec::new(),
            theirs: Vec::new(),
        }
    }

    fn unterminated(&self) -> String {
        format!("Unterminated conflict region starting at line {}", self.line)
    }
}

/// Matches a marker line, returning its optional label.
fn marker(line: &str, marker: &str) -> Option<Option<String>> {
    let rest = line.strip_prefix(marker)?;
    if rest.is_empty() {
        return Some(None);
    }
    if !rest.starts_with(' ') {
        return None;
    }
    let label = rest.trim();
    Some((!label.is_empty()).then(|| label.to_string()))
}

fn is_separator(line: &str) -> bool {
    line.strip_prefix(SEPARATOR_MARKER)
        .is_some_and(|rest| rest.trim().is_empty())
}

/// Trims trailing whitespace per line and drops surrounding blank lines.
fn normalize(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    let mut joined = lines[start..end].join("\n");
    if !joined.is_empty() {
        joined.push('\n');
    }
    joined
}

/// Returns (differing lines, common lines) between the two sides.
fn line_changes(ours: &str, theirs: &str) -> (usize, usize) {
    let diff = TextDiff::from_lines(ours, theirs);
    let (mut deleted, mut inserted, mut common) = (0, 0, 0);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => deleted += 1,
            ChangeTag::Insert => inserted += 1,
            ChangeTag::Equal => common += 1,
        }
    }
    (deleted.max(inserted), common)
}

fn suggest(kind: ConflictType, ours: &str, theirs: &str) -> (Resolution, String) {
    match kind {
        ConflictType::Addition => (
            Resolution::TakeTheirs,
            "Only the incoming side has content. Keep theirs.".to_string(),
        ),
        ConflictType::Deletion => (
            Resolution::TakeOurs,
            "Only the current side has content. Keep ours unless the deletion is intended."
                .to_string(),
        ),
        ConflictType::ModificationMinor => {
            let (differing, _) = line_changes(&normalize(ours), &normalize(theirs));
            if differing == 0 {
                (
                    Resolution::Either,
                    "Both sides are equivalent. Keep either.".to_string(),
                )
            } else {
                (
                    Resolution::Combine,
                    format!(
                        "Sides differ in {differing} line{}. Combine both edits by hand.",
                        if differing == 1 { "" } else { "s" }
                    ),
                )
            }
        }
        ConflictType::ModificationMajor => (
            Resolution::Review,
            "Sides diverge substantially. Review both versions before choosing.".to_string(),
        ),
    }
}

/// Analyzes every conflicted file in the working tree.
///
/// Unreadable files are reported per file and do not abort the run.
pub fn analyze_repository(
    backend: &dyn GitBackend,
    analyzer: &ConflictAnalyzer,
) -> Result<ConflictReport, GitError> {
    let output = backend.run(&GitRequest::ConflictedFiles)?;
    let mut report = ConflictReport::default();

    for path in output.stdout.lines().map(str::trim).filter(|p| !p.is_empty()) {
        match backend.read_file(Path::new(path)) {
            Ok(content) => report.files.push(analyzer.analyze_content(path, &content)),
            Err(e) => {
                tracing::warn!("Could not read conflicted file {path}: {e}");
                report.files.push(FileConflicts {
                    path: path.to_string(),
                    error: Some(e.to_string()),
                    ..Default::default()
                });
            }
        }
    }

    Ok(report)
}
