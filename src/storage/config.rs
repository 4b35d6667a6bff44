//! Configuration handling for dacdoc
//!
//! Configuration is stored in `.dacdoc.toml` at the documentation root
//! (project) and `~/.config/dacdoc/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Badges;

/// File name of the project configuration
pub const CONFIG_FILE: &str = ".dacdoc.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// How link targets are probed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Never touch the network; remote links are indeterminate
    pub offline: bool,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// User-Agent header for remote requests
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            offline: false,
            timeout_secs: 10,
            user_agent: format!("dacdoc/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Extensions of documentation files, without the dot
    pub extensions: Vec<String>,

    /// Directory names skipped during discovery
    pub exclude: Vec<String>,

    pub probe: ProbeConfig,

    /// Badges written by `dacdoc render`
    pub render: Badges,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string()],
            exclude: vec!["target".to_string(), "node_modules".to_string()],
            probe: ProbeConfig::default(),
            render: Badges::default(),
        }
    }
}

impl ProjectConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid("extensions must not be empty".to_string()));
        }
        if let Some(ext) = self.extensions.iter().find(|e| e.starts_with('.') || e.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "extension '{}' must be given without a leading dot",
                ext
            )));
        }
        if self.probe.timeout_secs == 0 {
            return Err(ConfigError::Invalid("probe.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Returns true if `path` has one of the configured extensions
    pub fn is_doc_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
}

impl Config {
    /// Loads configuration for a documentation root
    pub fn for_root(root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(root)?;

        Ok(Self { project, global })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "dacdoc", "dacdoc").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    pub fn load_project_config(root: &Path) -> Result<ProjectConfig> {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            log::debug!("No {} in {}, using defaults", CONFIG_FILE, root.display());
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config
            .validate()
            .with_context(|| format!("Invalid project config: {}", config_path.display()))?;

        Ok(config)
    }

    /// Writes a commented default project config, unless one exists.
    /// Returns true if a file was written.
    pub fn write_default(root: &Path) -> Result<bool> {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            return Ok(false);
        }

        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create directory: {}", root.display()))?;

        let default_config = r#"# dacdoc configuration

# Extensions of documentation files to scan
extensions = ["md"]

# Directory names to skip (hidden directories are always skipped)
exclude = ["target", "node_modules"]

[probe]
# Set to true to skip remote links
offline = false
timeout_secs = 10

[render]
passed = "✅"
failed = "❌"
indeterminate = "❔"
"#;
        fs::write(&config_path, default_config)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

        Ok(true)
    }
}
