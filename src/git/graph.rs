//! Commit graph parsing and rendering.
//!
//! Input is `git log --graph` output in the graph pretty format. Each row
//! carries the ASCII lane drawing git produced and, for commit rows, the
//! commit's hash, parents, refs and subject.

use colored::{Color, Colorize};
use serde::Serialize;

use super::inspector::{GitBackend, GitRequest, LogQuery};
use super::GitError;

const FIELD_SEPARATOR: char = '\x1f';

const LANE_COLORS: [Color; 6] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphCommit {
    pub hash: String,
    pub parents: Vec<String>,
    /// Branch and tag decorations, e.g. `HEAD -> main` or `tag: v1.0`
    pub refs: Vec<String>,
    pub subject: String,
    /// Lane holding the commit node, counted from the left
    pub lane: usize,
}

impl GraphCommit {
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphRow {
    /// Lane drawing as produced by git
    pub graph: String,
    pub commit: Option<GraphCommit>,
}

/// Parsed `git log --graph` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogGraph {
    rows: Vec<GraphRow>,
}

impl LogGraph {
    pub fn parse(output: &str) -> Self {
        let rows = output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_row)
            .collect();
        Self { rows }
    }

    /// Runs `git log --graph` and parses the result.
    ///
    /// A repository without commits yields an empty graph.
    pub fn load(backend: &dyn GitBackend, count: usize, all_refs: bool) -> Result<Self, GitError> {
        if !backend.has_commits(all_refs) {
            return Ok(Self::default());
        }
        let query = LogQuery::graph().count(count).all_refs(all_refs);
        let output = backend.run(&GitRequest::Log(query))?;
        Ok(Self::parse(&output.stdout))
    }

    pub fn rows(&self) -> &[GraphRow] {
        &self.rows
    }

    pub fn commits(&self) -> impl Iterator<Item = &GraphCommit> {
        self.rows.iter().filter_map(|row| row.commit.as_ref())
    }

    pub fn find(&self, hash: &str) -> Option<&GraphCommit> {
        self.commits().find(|c| c.hash == hash)
    }

    /// Widest number of lanes used by any row.
    pub fn lane_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| (row.graph.trim_end().chars().count() + 1) / 2)
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn is_graph_char(c: char) -> bool {
    matches!(c, '*' | '|' | '/' | '\\' | '_' | '-' | '.' | ' ')
}

fn parse_row(line: &str) -> GraphRow {
    if !line.contains(FIELD_SEPARATOR) {
        return GraphRow {
            graph: line.to_string(),
            commit: None,
        };
    }

    let split = line
        .char_indices()
        .find(|(_, c)| !is_graph_char(*c))
        .map_or(line.len(), |(i, _)| i);
    let (graph, rest) = line.split_at(split);

    let mut fields = rest.splitn(4, FIELD_SEPARATOR);
    let hash = fields.next().unwrap_or("").trim().to_string();
    let parents = fields
        .next()
        .unwrap_or("")
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let refs = parse_decoration(fields.next().unwrap_or(""));
    let subject = fields.next().unwrap_or("").to_string();
    let lane = graph.chars().position(|c| c == '*').unwrap_or(0) / 2;

    GraphRow {
        graph: graph.to_string(),
        commit: Some(GraphCommit {
            hash,
            parents,
            refs,
            subject,
            lane,
        }),
    }
}

fn parse_decoration(decoration: &str) -> Vec<String> {
    let trimmed = decoration.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);
    inner
        .split(", ")
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Draws a [`LogGraph`] with optional box-drawing glyphs and lane colors.
#[derive(Debug, Clone, Copy)]
pub struct LogGraphRenderer {
    unicode: bool,
    color: bool,
}

impl Default for LogGraphRenderer {
    fn default() -> Self {
        Self {
            unicode: true,
            color: true,
        }
    }
}

impl LogGraphRenderer {
    pub fn new(unicode: bool, color: bool) -> Self {
        Self { unicode, color }
    }

    pub fn render(&self, graph: &LogGraph) -> String {
        let mut output = String::new();

        for row in graph.rows() {
            let mut line = String::new();
            for (column, c) in row.graph.chars().enumerate() {
                if c == ' ' {
                    line.push(' ');
                    continue;
                }
                let glyph = self.glyph(c).to_string();
                line.push_str(&self.paint(&glyph, LANE_COLORS[(column / 2) % LANE_COLORS.len()]));
            }

            if let Some(commit) = &row.commit {
                line.push_str(&self.paint(&commit.hash, Color::Yellow));
                if !commit.refs.is_empty() {
                    let refs = format!(" ({})", commit.refs.join(", "));
                    if self.color {
                        line.push_str(&refs.green().bold().to_string());
                    } else {
                        line.push_str(&refs);
                    }
                }
                line.push(' ');
                line.push_str(&commit.subject);
            }

            output.push_str(line.trim_end());
            output.push('\n');
        }

        output
    }

    fn glyph(&self, c: char) -> char {
        if !self.unicode {
            return c;
        }
        match c {
            '*' => '●',
            '|' => '│',
            '/' => '╱',
            '\\' => '╲',
            '-' => '─',
            other => other,
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }
}
