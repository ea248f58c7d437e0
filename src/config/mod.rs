//! # Configuration Management Module
//!
//! Loads the TOML configuration consumed by the `mobboard` binary and by hosts that
//! embed the library.
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! connection_string = "sled://./data/mobboard"
//! database = "mbl-players"
//!
//! [leaderboard]
//! size = 10
//!
//! [rewards]
//! placements = ["DIAMOND", "GOLD_INGOT", "IRON_INGOT"]
//! fallback = "COAL"
//! catalog = ["EMERALD"]
//!
//! [logging]
//! level = "info"
//! file = "mobboard.log"
//! debug = false
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mobboard::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("store: {}", config.storage.connection_string);
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `sled://<dir>`, `memory://`, or a bare directory path.
    pub connection_string: String,
    /// Logical database holding one collection per player.
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_database() -> String {
    "mbl-players".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// How many players a board shows and a reward run pays out.
    #[serde(default = "default_leaderboard_size")]
    pub size: usize,
}

fn default_leaderboard_size() -> usize {
    10
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            size: default_leaderboard_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// Rewards for positions 1, 2, 3, ... in order.
    #[serde(default = "default_placements")]
    pub placements: Vec<String>,
    /// Reward for ranked players past the end of `placements`.
    #[serde(default = "default_fallback")]
    pub fallback: String,
    /// Extra reward ids accepted from the pending slot.
    #[serde(default)]
    pub catalog: Vec<String>,
}

fn default_placements() -> Vec<String> {
    vec![
        "DIAMOND".to_string(),
        "GOLD_INGOT".to_string(),
        "IRON_INGOT".to_string(),
    ]
}

fn default_fallback() -> String {
    "COAL".to_string()
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            placements: default_placements(),
            fallback: default_fallback(),
            catalog: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
    /// Shortcut for `level = "debug"`.
    #[serde(default)]
    pub debug: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            debug: false,
        }
    }
}

impl LoggingConfig {
    /// Effective level filter; unknown level names fall back to info.
    pub fn level_filter(&self) -> log::LevelFilter {
        if self.debug {
            return log::LevelFilter::Debug;
        }
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.connection_string.trim().is_empty() {
            return Err(anyhow!("storage.connection_string must not be empty"));
        }
        if self.storage.database.trim().is_empty() {
            return Err(anyhow!("storage.database must not be empty"));
        }
        if self.leaderboard.size == 0 {
            return Err(anyhow!("leaderboard.size must be at least 1"));
        }
        if self.rewards.fallback.trim().is_empty() {
            return Err(anyhow!("rewards.fallback must not be empty"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                connection_string: "sled://./data/mobboard".to_string(),
                database: default_database(),
            },
            leaderboard: LeaderboardConfig::default(),
            rewards: RewardsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("mobboard.log".to_string()),
                debug: false,
            },
        }
    }
}
