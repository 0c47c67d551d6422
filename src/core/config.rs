//! Configuration management for ioc-sweep.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default hash scan worker pool size.
pub const DEFAULT_HASH_WORKERS: usize = 50;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Indicator feed settings
    #[serde(default)]
    pub feeds: FeedConfig,
    /// Scan engine settings
    #[serde(default)]
    pub scan: EngineConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config file: {}", e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigSave(format!("Failed to create config directory: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| Error::ConfigSave(format!("Failed to write config file: {}", e)))
    }

    /// Load configuration from default location, or create default if not exists.
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            match Self::load(&config_path).and_then(|c| c.validate().map(|_| c)) {
                Ok(config) => return config,
                Err(e) => {
                    log::warn!("Failed to load config, using defaults: {}", e);
                    return Self::default();
                }
            }
        }

        let config = Self::default();

        if let Err(e) = config.save(&config_path) {
            log::warn!("Failed to save default config: {}", e);
        }

        config
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.json")
    }

    /// Get the platform application data directory.
    pub fn default_data_dir() -> PathBuf {
        #[cfg(windows)]
        {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData"))
                .join("ioc-sweep")
        }

        #[cfg(not(windows))]
        {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("ioc-sweep")
        }
    }

    /// Directory holding cached indicator lists, settings and reports.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.scan.hash_workers == 0 {
            return Err(Error::ConfigInvalid {
                field: "scan.hash_workers".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.feeds.timeout_secs == 0 {
            return Err(Error::ConfigInvalid {
                field: "feeds.timeout_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        for (field, url) in [
            ("feeds.hash_list_url", &self.feeds.hash_list_url),
            ("feeds.ip_list_url", &self.feeds.ip_list_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::ConfigInvalid {
                    field: field.to_string(),
                    message: format!("Not an HTTP(S) URL: {}", url),
                });
            }
        }

        Ok(())
    }
}

/// Remote indicator feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Newline-delimited list of recent malicious MD5 hashes
    pub hash_list_url: String,
    /// Newline-delimited IP denylist
    pub ip_list_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header sent to feed servers
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            hash_list_url: "https://bazaar.abuse.ch/export/txt/md5/recent/".to_string(),
            ip_list_url: "https://binarydefense.com/banlist.txt".to_string(),
            timeout_secs: 30,
            user_agent: format!("ioc-sweep/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Scan engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of concurrent hashing workers
    pub hash_workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_workers: DEFAULT_HASH_WORKERS,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Enable module paths in console output
    pub verbose_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            verbose_console: false,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Override for the data directory
    pub data_dir: Option<PathBuf>,
}
