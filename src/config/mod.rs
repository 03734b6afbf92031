//! Agent configuration management for `agent.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── check      # [check]
//! │   └── serve      # [serve]
//! ├── error          # ConfigError
//! ├── util           # config file lookup
//! └── mod.rs         # AgentConfig (this file)
//! ```
//!
//! The file is optional. Without one, `check` talks to `127.0.0.1:5142` with
//! the default polling bounds.

pub mod section;
mod error;
mod util;

pub use error::ConfigError;
pub use section::{CheckConfig, ServeConfig};

use util::find_config_file;

use crate::{cli::Cli, log};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_NAME: &str = "agent.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing agent.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Path of the loaded config file, if any (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Check client settings
    #[serde(default)]
    pub check: CheckConfig,

    /// Standalone server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl AgentConfig {
    /// Load configuration according to CLI arguments.
    ///
    /// An explicit `--config` must exist. Otherwise `agent.toml` is searched
    /// upward from the current directory, falling back to defaults.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let path = match &cli.config {
            Some(explicit) => {
                let path = cwd.join(explicit);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => find_config_file(&cwd, Path::new(DEFAULT_CONFIG_NAME)),
        };

        let Some(path) = path else {
            return Ok(Self::default());
        };

        let mut config = Self::from_path(&path)?;
        if let Some(root) = path.parent() {
            config.serve.normalize_paths(root);
        }
        config.config_path = Some(path);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "ignoring unknown fields in {}: {}", display_path, fields.join(", "));
    }

    /// Check every section, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems: Vec<String> = self
            .check
            .problems()
            .into_iter()
            .map(|(field, message)| format!("[{field}] {message}"))
            .collect();
        problems.extend(
            self.serve
                .problems()
                .into_iter()
                .map(|(field, message)| format!("[{field}] {message}")),
        );

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems.join("; ")))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub fn test_parse_config(content: &str) -> AgentConfig {
    let (parsed, ignored) = AgentConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
