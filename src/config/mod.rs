//! Configuration management.
//!
//! Settings live in `~/.bocode-cli/config.yaml`. The file is read once at
//! startup and the resulting [`Config`] is passed explicitly to every
//! component; nothing below the CLI reads the environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::git::classify::CommitCategory;
use crate::git::conflict::ConflictThresholds;
use crate::storage::atomic::write_atomic;

/// Name of the application data directory under the home directory.
const APP_DIR: &str = ".bocode-cli";

/// Name of the configuration file inside the data directory.
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overrides the data directory holding history and templates
    pub data_dir: Option<PathBuf>,

    /// Model identifier handed to the model client
    pub model: Option<String>,

    /// Conflict classification thresholds
    pub conflict: ConflictThresholds,

    /// Commit classification settings
    pub classifier: ClassifierConfig,

    /// Default retrospective window in days
    pub retrospective_days: i64,

    /// Default number of commits shown by log commands
    pub log_count: usize,

    /// Fail rendering when a template variable is missing
    pub strict_templates: bool,

    /// Graph rendering options
    pub graph: GraphConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            model: None,
            conflict: ConflictThresholds::default(),
            classifier: ClassifierConfig::default(),
            retrospective_days: 14,
            log_count: 10,
            strict_templates: true,
            graph: GraphConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Extra keywords per category, appended to the built-in table
    pub keywords: BTreeMap<CommitCategory, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Replace ASCII graph glyphs with box-drawing characters
    pub unicode: bool,

    /// Color graph lanes
    pub color: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            unicode: true,
            color: true,
        }
    }
}

/// Keys accepted by `config get` and `config set`.
pub const KEYS: &[&str] = &[
    "data_dir",
    "model",
    "conflict.minor_max_lines",
    "conflict.similarity_floor",
    "retrospective_days",
    "log_count",
    "strict_templates",
    "graph.unicode",
    "graph.color",
];

impl Config {
    /// Loads the configuration from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Loads the configuration from `path`, defaulting when absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_saphyr::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))
    }

    /// Writes the configuration to `path` atomically.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let yaml = serde_saphyr::to_string(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        write_atomic(path, yaml.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// The default application directory, `~/.bocode-cli`.
    pub fn app_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?
            .join(APP_DIR))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join(CONFIG_FILE))
    }

    /// Directory holding history and templates.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::app_dir(),
        }
    }

    /// Reads a single setting as text.
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "data_dir" => self
                .data_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            "model" => self.model.clone().unwrap_or_default(),
            "conflict.minor_max_lines" => self.conflict.minor_max_lines.to_string(),
            "conflict.similarity_floor" => self.conflict.similarity_floor.to_string(),
            "retrospective_days" => self.retrospective_days.to_string(),
            "log_count" => self.log_count.to_string(),
            "strict_templates" => self.strict_templates.to_string(),
            "graph.unicode" => self.graph.unicode.to_string(),
            "graph.color" => self.graph.color.to_string(),
            _ => bail!(
                "Unknown config key '{}'. Valid keys: {}",
                key,
                KEYS.join(", ")
            ),
        };
        Ok(value)
    }

    /// Updates a single setting from text, validating its type.
    ///
    /// An empty value clears optional settings.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || format!("Invalid value '{value}' for '{key}'");
        match key {
            "data_dir" => {
                self.data_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "model" => {
                self.model = (!value.is_empty()).then(|| value.to_string());
            }
            "conflict.minor_max_lines" => {
                let lines: usize = value.parse().with_context(invalid)?;
                if lines == 0 {
                    bail!("conflict.minor_max_lines must be at least 1");
                }
                self.conflict.minor_max_lines = lines;
            }
            "conflict.similarity_floor" => {
                let floor: f32 = value.parse().with_context(invalid)?;
                if !(0.0..=1.0).contains(&floor) {
                    bail!("conflict.similarity_floor must be between 0 and 1");
                }
                self.conflict.similarity_floor = floor;
            }
            "retrospective_days" => {
                self.retrospective_days = value.parse().with_context(invalid)?;
            }
            "log_count" => self.log_count = value.parse().with_context(invalid)?,
            "strict_templates" => self.strict_templates = value.parse().with_context(invalid)?,
            "graph.unicode" => self.graph.unicode = value.parse().with_context(invalid)?,
            "graph.color" => self.graph.color = value.parse().with_context(invalid)?,
            _ => bail!(
                "Unknown config key '{}'. Valid keys: {}",
                key,
                KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.conflict.minor_max_lines, 3);
        assert_eq!(config.retrospective_days, 14);
        assert!(config.strict_templates);
        assert!(config.graph.unicode);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "log_count: 25\nconflict:\n  minor_max_lines: 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.log_count, 25);
        assert_eq!(config.conflict.minor_max_lines, 5);
        assert_eq!(config.conflict.similarity_floor, 0.5);
        assert_eq!(config.retrospective_days, 14);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.set("model", "claude-sonnet").unwrap();
        config.set("graph.color", "false").unwrap();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_get_and_set() {
        let mut config = Config::default();
        config.set("log_count", "42").unwrap();
        assert_eq!(config.get("log_count").unwrap(), "42");

        config.set("data_dir", "/tmp/bocode").unwrap();
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/bocode"));
        config.set("data_dir", "").unwrap();
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("log_count", "many").is_err());
        assert!(config.set("conflict.minor_max_lines", "0").is_err());
        assert!(config.set("conflict.similarity_floor", "1.5").is_err());
        assert!(config.set("unknown.key", "x").is_err());
        assert!(config.get("unknown.key").is_err());
    }
}
