//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/scriptlines/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/scriptlines/` (~/.config/scriptlines/)
//! - Data: `$XDG_DATA_HOME/scriptlines/` (~/.local/share/scriptlines/)
//! - State/Logs: `$XDG_STATE_HOME/scriptlines/` (~/.local/state/scriptlines/)

use crate::error::{Error, Result};
use crate::ingest::PatternConfig;
use crate::types::Show;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database location
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Script collections to ingest, in order
    #[serde(default = "default_collections")]
    pub collections: Vec<CollectionConfig>,

    /// Ingestion behaviour
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Line classification patterns
    #[serde(default)]
    pub patterns: PatternConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            collections: default_collections(),
            ingest: IngestConfig::default(),
            patterns: PatternConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Database location override
#[derive(Debug, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Path to the SQLite file; defaults to the XDG data directory
    pub path: Option<PathBuf>,
}

/// One folder of scripts
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Show code; derived from the folder name when omitted
    pub show: Option<Show>,

    /// Folder holding one script file per episode
    pub path: PathBuf,

    /// Glob pattern selecting script files inside the folder
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

fn default_collections() -> Vec<CollectionConfig> {
    vec![
        CollectionConfig {
            show: Some(Show::Tng),
            path: PathBuf::from("./scripts/tng"),
            pattern: default_pattern(),
        },
        CollectionConfig {
            show: Some(Show::Ds9),
            path: PathBuf::from("./scripts/dsn"),
            pattern: default_pattern(),
        },
    ]
}

fn default_pattern() -> String {
    "*".to_string()
}

/// Ingestion behaviour
#[derive(Debug, Deserialize, Default)]
pub struct IngestConfig {
    /// Store lines again for episodes that already have lines
    #[serde(default)]
    pub reingest: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.logging.max_files == 0 {
            return Err(Error::Config(
                "logging.max_files must be at least 1".to_string(),
            ));
        }
        for collection in &self.collections {
            if collection.pattern.trim().is_empty() {
                return Err(Error::Config(format!(
                    "collection {:?} has an empty pattern",
                    collection.path
                )));
            }
            if collection.show.is_none() {
                Show::from_folder(&collection.path)?;
            }
        }
        Ok(())
    }

    /// Database path from config, or the default location
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Self::database_path)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/scriptlines/config.toml` (~/.config/scriptlines/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("scriptlines").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/scriptlines/` (~/.local/share/scriptlines/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("scriptlines")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/scriptlines/` (~/.local/state/scriptlines/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("scriptlines")
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/scriptlines/scripts.sqlite3`
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("scripts.sqlite3")
    }

    /// Returns the log file path prefix
    ///
    /// `$XDG_STATE_HOME/scriptlines/scriptlines.log`; rotated files carry a date suffix.
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("scriptlines.log")
    }
}
