//! Configuration management for jobharvest.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration.
///
/// This is loaded from `~/.config/jobharvest/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Card iteration and challenge handling settings
    pub scraping: ScrapingConfig,
    /// Result buffer persistence settings
    pub buffer: BufferConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, falling back to defaults if
    /// the file does not exist.
    pub fn load_from(config_path: &std::path::Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `JOBHARVEST_HEADLESS`: Override browser headless mode (true/false)
    /// - `JOBHARVEST_BUFFER_CAP`: Override the result buffer cap
    /// - `JOBHARVEST_MAX_CARDS`: Override the per-page card cap for every platform
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides on top of the loaded values.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("JOBHARVEST_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("JOBHARVEST_BUFFER_CAP") {
            if let Ok(cap) = val.parse() {
                self.buffer.cap = cap;
                tracing::debug!("Override buffer.cap from env: {}", cap);
            }
        }

        if let Ok(val) = std::env::var("JOBHARVEST_MAX_CARDS") {
            if let Ok(max_cards) = val.parse() {
                self.scraping.max_cards = Some(max_cards);
                tracing::debug!("Override scraping.max_cards from env: {}", max_cards);
            }
        }
    }

    /// Check values that would make a run misbehave.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.buffer.cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "buffer.cap".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.scraping.challenge_poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scraping.challenge_poll_interval_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.scraping.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scraping.max_pages".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/jobharvest/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "jobharvest", "jobharvest")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/jobharvest`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "jobharvest", "jobharvest")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Full path of the result buffer database.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        Ok(Self::data_dir()?.join(&self.buffer.database_file))
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode. Challenges can only be cleared by a
    /// human in a visible window, so the default is `false`.
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Explicit Chrome/Chromium executable; autodetected when unset
    pub chrome_executable: Option<String>,
    /// Minimum interval between navigations to the same host
    pub min_navigation_interval_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1440,
            window_height: 900,
            navigation_timeout_secs: 30,
            chrome_executable: None,
            min_navigation_interval_ms: 3000,
        }
    }
}

/// Card iteration and challenge handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Cap on cards per page; the platform cap applies when unset or lower
    pub max_cards: Option<usize>,
    /// Pages to follow in one run
    pub max_pages: u32,
    /// Fixed delay applied after a card fails unexpectedly
    pub error_recovery_delay_ms: u64,
    /// Poll interval while waiting for a human to clear a challenge
    pub challenge_poll_interval_secs: u64,
    /// Upper bound on waiting for a challenge to be cleared
    pub challenge_timeout_secs: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_cards: None,
            max_pages: 1,
            error_recovery_delay_ms: 1500,
            challenge_poll_interval_secs: 3,
            challenge_timeout_secs: 600,
        }
    }
}

/// Result buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of records retained
    pub cap: usize,
    /// Database file name inside the data directory
    pub database_file: String,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            cap: 1000,
            database_file: "jobharvest.db".to_string(),
        }
    }
}
