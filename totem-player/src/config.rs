//! Configuration management for totem-player
//!
//! Two tiers:
//! 1. **Bootstrap**: command line / environment, then TOML, then compiled
//!    defaults. Cannot change while running.
//! 2. **Runtime**: tunables in the database `settings` table. Missing values
//!    are written back with their built-in defaults.

use crate::db::settings::{get_setting, set_setting};
use crate::error::Result;
use clap::Parser;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use totem_common::config::{
    default_config_path, resolve_database_path, resolve_root_folder, CompiledDefaults, TomlConfig,
};
use tracing::{info, warn};

/// Command-line arguments for totem-player
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "totem-player")]
#[command(about = "Unattended signage player: cycles through a device's assigned playlist")]
#[command(version)]
pub struct Args {
    /// TOML bootstrap file
    #[arg(short, long, env = "TOTEM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port for the display/control HTTP server
    #[arg(short, long, env = "TOTEM_PORT")]
    pub port: Option<u16>,

    /// Folder holding the player database
    #[arg(long, env = "TOTEM_ROOT_FOLDER")]
    pub root_folder: Option<PathBuf>,

    /// Explicit database file path
    #[arg(long, env = "TOTEM_DATABASE")]
    pub database: Option<PathBuf>,

    /// Base URL of the signage backend
    #[arg(long, env = "TOTEM_API_URL")]
    pub api_url: Option<String>,

    /// Device identifier (token) to play on launch
    #[arg(short, long, env = "TOTEM_DEVICE_ID")]
    pub device_id: Option<String>,

    /// Bearer token for the backend
    #[arg(long, env = "TOTEM_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,
}

/// Resolved bootstrap configuration
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub port: u16,
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub api_url: String,
    pub device_id: Option<String>,
    pub api_token: Option<String>,
    pub log_level: String,
}

impl PlayerConfig {
    /// Load the TOML file named on the command line (or the default one)
    /// and merge it under the command-line values
    pub fn load(args: &Args) -> Result<Self> {
        let toml_path = args.config.clone().unwrap_or_else(default_config_path);
        let toml = TomlConfig::load_or_default(&toml_path)?;
        Ok(Self::resolve(args, &toml))
    }

    /// Merge command line over TOML over compiled defaults
    pub fn resolve(args: &Args, toml: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let root_folder = resolve_root_folder(args.root_folder.as_deref(), toml);
        let database_path = resolve_database_path(args.database.as_deref(), toml, &root_folder);

        let api_url = args
            .api_url
            .clone()
            .or_else(|| toml.api_url.clone())
            .unwrap_or(defaults.api_url);

        Self {
            port: args.port.or(toml.port).unwrap_or(defaults.port),
            root_folder,
            database_path,
            api_url: api_url.trim_end_matches('/').to_string(),
            device_id: args
                .device_id
                .clone()
                .or_else(|| toml.device_id.clone())
                .filter(|id| !id.trim().is_empty()),
            api_token: args
                .api_token
                .clone()
                .or_else(|| toml.api_token.clone())
                .filter(|t| !t.is_empty()),
            log_level: toml.logging.level.clone(),
        }
    }
}

/// Longest refresh or heartbeat period accepted, in seconds
pub const MAX_BACKGROUND_INTERVAL_S: u64 = 86_400;

/// Runtime settings loaded from the database
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    /// Floor substituted for invalid item durations
    pub min_display_ms: u64,
    /// Snapshot refresh period, 0 disables
    pub playlist_refresh_interval_s: u64,
    /// Heartbeat period, 0 disables
    pub heartbeat_interval_s: u64,
    /// Timeout for every backend request
    pub http_request_timeout_ms: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            min_display_ms: 1000,
            playlist_refresh_interval_s: 300,
            heartbeat_interval_s: 30,
            http_request_timeout_ms: 10_000,
        }
    }
}

impl RuntimeSettings {
    /// Load runtime settings from database
    ///
    /// For each setting: read it; if missing, write the default back; if
    /// unparseable, warn and use the default.
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();

        let settings = Self {
            min_display_ms: load_u64(pool, "player_min_display_ms", defaults.min_display_ms)
                .await?
                .clamp(100, 60_000),
            playlist_refresh_interval_s: load_u64(
                pool,
                "playlist_refresh_interval_s",
                defaults.playlist_refresh_interval_s,
            )
            .await?
            .min(MAX_BACKGROUND_INTERVAL_S),
            heartbeat_interval_s: load_u64(
                pool,
                "heartbeat_interval_s",
                defaults.heartbeat_interval_s,
            )
            .await?
            .min(MAX_BACKGROUND_INTERVAL_S),
            http_request_timeout_ms: load_u64(
                pool,
                "http_request_timeout_ms",
                defaults.http_request_timeout_ms,
            )
            .await?
            .max(100),
        };

        info!("Loaded runtime settings from database: {:?}", settings);
        Ok(settings)
    }

    pub fn min_display(&self) -> Duration {
        Duration::from_millis(self.min_display_ms)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.playlist_refresh_interval_s > 0)
            .then(|| Duration::from_secs(self.playlist_refresh_interval_s))
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_s > 0).then(|| Duration::from_secs(self.heartbeat_interval_s))
    }

    pub fn http_request_timeout(&self) -> Duration {
        Duration::from_millis(self.http_request_timeout_ms)
    }
}

async fn load_u64(pool: &SqlitePool, key: &str, default: u64) -> Result<u64> {
    match get_setting::<u64>(pool, key).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            info!("Setting '{}' not found in database, using default: {}", key, default);
            set_setting(pool, key, default).await?;
            Ok(default)
        }
        Err(crate::error::Error::Config(msg)) => {
            warn!("{}; using default {}", msg, default);
            Ok(default)
        }
        Err(e) => Err(e),
    }
}
