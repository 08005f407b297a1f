// Server configuration: optional TOML file plus CLI/environment overrides

use crate::server::DEFAULT_MAX_LINE_LENGTH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Document root used when neither the CLI, the environment nor the file sets one
pub const DEFAULT_DOCS_ROOT: &str = "..";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub docs: DocsConfig,

    #[serde(default)]
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocsConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_line_length: default_max_line_length(),
        }
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub docs_path: Option<PathBuf>,
    pub max_line_length: Option<usize>,
}

/// Fully resolved settings, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub docs_root: PathBuf,
    pub max_line_length: usize,
}

impl ServerConfig {
    pub fn load(config_path: &Path, overrides: ConfigOverrides) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        let file = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read configuration file {}", config_path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse configuration file {}", config_path.display()))?
        } else {
            tracing::debug!("Configuration file {} not found, using defaults", config_path.display());
            FileConfig::default()
        };

        let cwd = std::env::current_dir().context("Failed to determine working directory")?;
        let config = Self::resolve(file, overrides, &cwd)?;

        if !config.docs_root.is_dir() {
            tracing::warn!(
                "Document root {} is not a directory; every read will fail",
                config.docs_root.display()
            );
        }

        Ok(config)
    }

    /// Merge file settings and overrides; relative roots are taken from `cwd`
    pub fn resolve(file: FileConfig, overrides: ConfigOverrides, cwd: &Path) -> Result<Self> {
        let docs_root = overrides
            .docs_path
            .filter(|p| !p.as_os_str().is_empty())
            .or(file.docs.root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCS_ROOT));

        let max_line_length = overrides
            .max_line_length
            .unwrap_or(file.transport.max_line_length);
        if max_line_length == 0 {
            anyhow::bail!("max_line_length must be greater than zero");
        }

        Ok(Self {
            docs_root: cwd.join(docs_root),
            max_line_length,
        })
    }
}
