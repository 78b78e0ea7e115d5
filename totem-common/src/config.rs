//! Bootstrap configuration loading and root folder resolution
//!
//! Priority order for every bootstrap value:
//! 1. Command-line argument / environment variable (resolved by the binary)
//! 2. TOML config file
//! 3. OS-dependent compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "totem.db";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database (and anything else the player writes)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database path, overrides `<root_folder>/totem.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Base URL of the signage backend
    #[serde(default)]
    pub api_url: Option<String>,

    /// Device identifier (token) to start playing on launch
    #[serde(default)]
    pub device_id: Option<String>,

    /// Bearer token sent to the backend
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Parse a TOML config file, falling back to defaults when it is missing
    ///
    /// A missing file is expected on a fresh device and only logged. A file
    /// that exists but cannot be parsed is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub port: u16,
    pub api_url: String,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            port: 5780,
            api_url: "http://localhost:3001".to_string(),
            log_level: default_log_level(),
        }
    }
}

/// Default config file location (`<config_dir>/totem/player.toml`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("totem").join("player.toml"))
        .unwrap_or_else(|| PathBuf::from("player.toml"))
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("totem"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/totem"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("totem"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/totem"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("totem"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\totem"))
    } else {
        PathBuf::from("./totem_data")
    }
}

/// Resolve the root folder: CLI/env value, then TOML, then compiled default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Some(path) = &toml.root_folder {
        return path.clone();
    }
    CompiledDefaults::for_current_platform().root_folder
}

/// Resolve the database path: explicit value, TOML, then `<root>/totem.db`
pub fn resolve_database_path(
    cli_arg: Option<&Path>,
    toml: &TomlConfig,
    root_folder: &Path,
) -> PathBuf {
    cli_arg
        .map(Path::to_path_buf)
        .or_else(|| toml.database_path.clone())
        .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME))
}
