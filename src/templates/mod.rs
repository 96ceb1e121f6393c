//! Named, parameterised prompt templates.
//!
//! Templates live next to the conversation history, one JSON record per
//! name. Placeholders use `{{ name }}` syntax and are filled from the
//! caller's variables, falling back to the template's defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::storage::atomic::write_atomic;
use crate::storage::{json_records, validate_record_name, StorageError};

/// Record kind used in error messages.
const KIND: &str = "template";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Returns the template directory inside an application data directory.
pub fn default_template_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("templates")
}

/// Errors raised while loading or rendering templates.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Strict rendering found placeholders with no value.
    #[error("Missing template variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    /// A `key=value` assignment could not be parsed.
    #[error("Malformed variable '{0}', expected key=value")]
    MalformedVariable(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// How unresolved placeholders are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Fail with every unresolved placeholder listed.
    #[default]
    Strict,
    /// Leave unresolved placeholders in the output as written.
    Lenient,
}

impl RenderMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            RenderMode::Strict
        } else {
            RenderMode::Lenient
        }
    }
}

/// A named prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,

    /// Body text containing `{{ placeholder }}` markers
    pub content: String,

    /// Values used when the caller does not supply a variable
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,

    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Distinct placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        PLACEHOLDER
            .captures_iter(&self.content)
            .map(|c| c[1].to_string())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Substitutes placeholders with `variables`, then defaults.
    pub fn render(
        &self,
        variables: &BTreeMap<String, String>,
        mode: RenderMode,
    ) -> Result<String, TemplateError> {
        let mut missing: Vec<String> = Vec::new();

        let rendered = PLACEHOLDER.replace_all(&self.content, |caps: &Captures| {
            let name = &caps[1];
            match variables.get(name).or_else(|| self.defaults.get(name)) {
                Some(value) => value.clone(),
                None => {
                    if !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });

        if mode == RenderMode::Strict && !missing.is_empty() {
            return Err(TemplateError::MissingVariables(missing));
        }
        Ok(rendered.into_owned())
    }
}

/// Parses a `key=value` assignment.
pub fn parse_assignment(input: &str) -> Result<(String, String), TemplateError> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(TemplateError::MalformedVariable(input.to_string())),
    }
}

/// File-backed registry of templates.
pub struct TemplateRegistry {
    dir: PathBuf,
}

impl TemplateRegistry {
    /// Opens a registry rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Loads a template by name.
    pub fn load(&self, name: &str) -> Result<Template, StorageError> {
        validate_record_name(KIND, name)?;
        let path = self.record_path(name);
        if !path.exists() {
            return Err(StorageError::NotFound {
                kind: KIND,
                name: name.to_string(),
            });
        }

        let data = std::fs::read(&path).map_err(|e| StorageError::io(&path, e))?;
        serde_json::from_slice(&data).map_err(|e| StorageError::Corrupt {
            path,
            message: e.to_string(),
        })
    }

    /// Creates or replaces a template.
    pub fn save(
        &self,
        name: &str,
        content: &str,
        defaults: BTreeMap<String, String>,
    ) -> Result<Template, StorageError> {
        validate_record_name(KIND, name)?;
        let template = Template {
            name: name.to_string(),
            content: content.to_string(),
            defaults,
            updated_at: Utc::now(),
        };

        let path = self.record_path(name);
        let json = serde_json::to_vec_pretty(&template)
            .map_err(|e| StorageError::Invalid(format!("Failed to serialize template: {e}")))?;
        write_atomic(&path, &json).map_err(|e| StorageError::io(&path, e))?;

        tracing::debug!("Saved template {name}");
        Ok(template)
    }

    /// Removes a template.
    pub fn delete(&self, name: &str) -> Result<(), StorageError> {
        validate_record_name(KIND, name)?;
        let path = self.record_path(name);
        if !path.exists() {
            return Err(StorageError::NotFound {
                kind: KIND,
                name: name.to_string(),
            });
        }
        std::fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))
    }

    /// Sorted names of all stored templates.
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        let names = json_records(&self.dir)?
            .iter()
            .filter_map(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().to_string())
            .collect();
        Ok(names)
    }

    /// Loads and renders a template in one step.
    pub fn render(
        &self,
        name: &str,
        variables: &BTreeMap<String, String>,
        mode: RenderMode,
    ) -> Result<String, TemplateError> {
        let template = self.load(name)?;
        template.render(variables, mode)
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}
