//! Configuration management for the CLI
//!
//! Configuration is read from the first file found, or from the file named
//! by `--config`, and falls back to defaults:
//! - `.apimap.yaml` / `.apimap.json` in the current directory
//! - `apimap/config.yaml` in the user config directory
//! - `~/.apimap.yaml`

use crate::cli::Direction;
use crate::error::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tree building and matching settings
    pub mapping: MappingConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Path settings
    pub paths: PathConfig,
}

/// Mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Depth bound for tree building
    pub max_depth: usize,

    /// Direction used when `match` is given none
    pub default_direction: Direction,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Use colored output by default
    pub color: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no `-v` flag is given
    pub level: Option<String>,

    /// Log format (compact, full, json)
    pub format: Option<String>,

    /// Log file path
    pub file: Option<PathBuf>,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory finalized mappings are stored in
    pub mappings_dir: PathBuf,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            max_depth: apimap_core::DEFAULT_MAX_DEPTH,
            default_direction: Direction::Output,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        let mappings_dir = dirs::data_dir()
            .map(|d| d.join("apimap").join("mappings"))
            .unwrap_or_else(|| PathBuf::from(".apimap").join("mappings"));

        Self { mappings_dir }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    )
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;

        let config: Self = if is_yaml(path) {
            serde_yaml::from_str(&content)
                .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?
        };

        config.check()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Found configuration file");
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        if let Some(path) = file {
            Self::from_file(path)
        } else {
            Self::load()
        }
    }

    /// Get default configuration file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".apimap.yaml"), PathBuf::from(".apimap.json")];

        if let Some(path) = Self::user_config_path() {
            paths.push(path);
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".apimap.yaml"));
        }

        paths
    }

    /// Location `config init` writes to by default
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("apimap").join("config.yaml"))
    }

    fn check(&self) -> Result<()> {
        if self.mapping.max_depth == 0 {
            return Err(Error::config("mapping.max_depth must be at least 1"));
        }
        Ok(())
    }

    /// Tree builder honoring the configured depth bound
    pub fn tree_builder(&self) -> apimap_core::TreeBuilder {
        apimap_core::TreeBuilder::new().with_max_depth(self.mapping.max_depth)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Creating config directory")?;
        }

        std::fs::write(path, content).with_context(|| format!("Writing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "mapping:\n  default_direction: input\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.mapping.default_direction, Direction::Input);
        assert_eq!(config.mapping.max_depth, apimap_core::DEFAULT_MAX_DEPTH);
        assert!(config.output.color);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.mapping.max_depth = 12;
        config.paths.mappings_dir = dir.path().join("store");
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.mapping.max_depth, 12);
        assert_eq!(loaded.paths.mappings_dir, dir.path().join("store"));
        assert_eq!(loaded.tree_builder().max_depth(), 12);
    }

    #[test]
    fn test_save_under_a_file_names_the_step() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, "").unwrap();

        let err = Config::default().save(&blocker.join("config.json")).unwrap_err();
        assert!(err.to_string().starts_with("Creating config directory: IO error"));
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"mapping": {"max_depth": 0}}"#).unwrap();
        assert!(matches!(Config::from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load_with_file(Some(Path::new("/nonexistent/apimap.yaml"))).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
