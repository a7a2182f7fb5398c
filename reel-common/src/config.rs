//! Bootstrap configuration loading and root folder resolution
//!
//! Configuration comes from a single TOML file. Every section is optional;
//! missing values fall back to compiled defaults so a fresh install starts
//! without any file present.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the root (data) folder
pub const ROOT_FOLDER_ENV: &str = "REEL_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "REEL_CONFIG";

/// Whole bootstrap configuration as read from TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Folder holding the local database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Catalog backend connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Media URL handling
    #[serde(default)]
    pub media: MediaConfig,

    /// Watch-time thresholds and playback timers
    #[serde(default)]
    pub watch: WatchConfig,

    /// Entitlement override used when no purchase provider is wired in
    #[serde(default)]
    pub entitlement: EntitlementConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Catalog backend connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://host/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub bearer_token: String,

    /// Device identifier sent as the `uuid` query parameter
    #[serde(default)]
    pub device_uuid: String,

    /// Content language
    #[serde(default = "default_lang")]
    pub lang: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            bearer_token: String::new(),
            device_uuid: String::new(),
            lang: default_lang(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Media URL settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MediaConfig {
    /// Repeating XOR key applied to episode URLs by the backend.
    ///
    /// A deployment constant, not a secret.
    #[serde(default)]
    pub url_key: String,
}

/// Watch-time thresholds (seconds) and playback timers
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Watched time in the discover feed before a series is remembered
    #[serde(default = "default_feed_threshold_secs")]
    pub feed_threshold_secs: u64,

    /// Watched time in the detail player before a series is remembered
    #[serde(default = "default_detail_threshold_secs")]
    pub detail_threshold_secs: u64,

    /// Delay of the one-shot "did playback actually start" check
    #[serde(default = "default_confirm_delay_ms")]
    pub confirm_delay_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            feed_threshold_secs: default_feed_threshold_secs(),
            detail_threshold_secs: default_detail_threshold_secs(),
            confirm_delay_ms: default_confirm_delay_ms(),
        }
    }
}

impl WatchConfig {
    pub fn feed_threshold(&self) -> Duration {
        Duration::from_secs(self.feed_threshold_secs)
    }

    pub fn detail_threshold(&self) -> Duration {
        Duration::from_secs(self.detail_threshold_secs)
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }
}

/// Static entitlement settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EntitlementConfig {
    /// Treat the user as subscribed
    #[serde(default)]
    pub unlocked: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_base_url() -> String {
    "https://shortsdrama.online/api".to_string()
}

fn default_lang() -> String {
    "ru".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_feed_threshold_secs() -> u64 {
    40
}

fn default_detail_threshold_secs() -> u64 {
    60
}

fn default_confirm_delay_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var(CONFIG_PATH_ENV)
                .ok()
                .map(PathBuf::from)
                .or_else(|| default_config_path().ok()),
        };

        match path {
            Some(p) if p.exists() => Self::load(&p),
            Some(p) => {
                warn!("Config file {} not found, using defaults", p.display());
                Ok(Self::default())
            }
            None => {
                warn!("No config file location available, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check the values the catalog client cannot work without
    pub fn validate_api(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Config("api.base_url is empty".to_string()));
        }
        if self.api.bearer_token.trim().is_empty() {
            return Err(Error::Config("api.bearer_token is not set".to_string()));
        }
        if self.api.device_uuid.trim().is_empty() {
            return Err(Error::Config("api.device_uuid is not set".to_string()));
        }
        Ok(())
    }

    /// Path of the local SQLite database under the resolved root folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        root_folder.join("reel.db")
    }
}

/// Resolve the root folder following the priority order in the module docs
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("reel").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/reel
        dirs::data_local_dir()
            .map(|d| d.join("reel"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/reel"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/reel
        dirs::data_dir()
            .map(|d| d.join("reel"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/reel"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\reel
        dirs::data_local_dir()
            .map(|d| d.join("reel"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\reel"))
    } else {
        PathBuf::from("./reel_data")
    }
}
