//! Configuration loading and service URL resolution
//!
//! Bootstrap configuration comes from a TOML file. Every field has a
//! built-in default, so a missing file is never fatal.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (`MOSAIC_SERVICE_URL`)
//! 3. TOML configuration file
//! 4. Built-in defaults (see [`crate::tiles`])

use crate::tiles::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_SAMPLING_STRIDE, DEFAULT_SERVICE_URL, TILE_HEIGHT,
    TILE_WIDTH,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the tile service base URL
pub const SERVICE_URL_ENV: &str = "MOSAIC_SERVICE_URL";

/// Application folder name under the platform config directory
const CONFIG_DIR_NAME: &str = "svg-mosaic";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the tile rendering service (without the `/color/` suffix)
    #[serde(default)]
    pub service_url: Option<String>,

    /// Tile geometry
    #[serde(default)]
    pub tiles: TilesConfig,

    /// Per-tile fetch behaviour
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Sample every Nth pixel along each axis
    #[serde(default = "default_sampling_stride")]
    pub sampling_stride: u32,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tile geometry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesConfig {
    #[serde(default = "default_tile_width")]
    pub width: u32,
    #[serde(default = "default_tile_height")]
    pub height: u32,
}

/// Fetch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Timeout for one tile request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_tile_width() -> u32 {
    TILE_WIDTH
}

fn default_tile_height() -> u32 {
    TILE_HEIGHT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_sampling_stride() -> u32 {
    DEFAULT_SAMPLING_STRIDE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            tiles: TilesConfig::default(),
            fetch: FetchConfig::default(),
            sampling_stride: default_sampling_stride(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            width: default_tile_width(),
            height: default_tile_height(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TomlConfig {
    /// Reject values no run could use
    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout_secs == 0 {
            return Err(Error::Config("fetch.timeout_secs must be positive".to_string()));
        }
        if let Some(url) = &self.service_url {
            validate_service_url(url)?;
        }
        Ok(())
    }
}

/// Default configuration file path for the platform
///
/// `~/.config/svg-mosaic/config.toml` on Linux, the equivalent
/// per-user config directory elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join("config.toml"))
}

/// Load TOML configuration
///
/// A missing file logs a warning and yields defaults. A file that exists but
/// cannot be read or parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
    config.validate()?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Load configuration from an explicit path, or the platform default path
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    match explicit {
        Some(path) => load_toml_config(path),
        None => match default_config_path() {
            Some(path) => load_toml_config(&path),
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                Ok(TomlConfig::default())
            }
        },
    }
}

/// Service URL resolution:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. Compiled default (fallback)
pub fn resolve_service_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> Result<String> {
    let (url, source) = if let Some(url) = cli_arg {
        (url.to_string(), "command line")
    } else if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
        (url, "environment")
    } else if let Some(url) = &toml_config.service_url {
        (url.clone(), "TOML")
    } else {
        (DEFAULT_SERVICE_URL.to_string(), "default")
    };

    validate_service_url(&url)?;
    info!("Tile service URL {} (from {})", url, source);
    Ok(url.trim_end_matches('/').to_string())
}

fn validate_service_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Service URL must start with http:// or https://: {}",
            url
        )))
    }
}
