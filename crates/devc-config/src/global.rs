//! Global configuration for devc
//!
//! Located at `~/.config/devc/config.toml`

use crate::{ConfigError, Result, DEFAULT_CONFIG_DIR};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global devc configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub defaults: DefaultsConfig,
    pub engine: EngineConfig,
}

/// Default settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Shell used by `devc shell` when `--shell` is not given
    pub shell: String,
    /// Configuration directory, relative to the working directory
    pub config_dir: String,
    /// Delay before the background postAttachCommand runs
    pub post_attach_delay_ms: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            config_dir: DEFAULT_CONFIG_DIR.to_string(),
            post_attach_delay_ms: 1000,
        }
    }
}

/// External engine binaries, as argv prefixes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Single-container engine (`docker`, `podman`)
    pub docker: Vec<String>,
    /// Multi-service orchestrator (`docker compose`, `podman-compose`)
    pub compose: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            docker: vec!["docker".to_string()],
            compose: vec!["docker".to_string(), "compose".to_string()],
        }
    }
}

impl GlobalConfig {
    /// Load global configuration from the default path
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load global configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        if config.engine.docker.is_empty() || config.engine.compose.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{}: engine commands must not be empty",
                path.display()
            )));
        }

        tracing::debug!("Loaded config from {:?}: {:?}", path, config);

        Ok(config)
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "devc").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}
