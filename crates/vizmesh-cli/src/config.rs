use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use vizmesh_logging::LogConfig;
use vizmesh_storage::RedbStorageConfig;

/// Config file read from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "vizmesh.toml";

/// Application configuration, loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub logging: LogConfig,
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("invalid configuration")
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `vizmesh.toml` in the
    /// working directory is used if present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("in {}", path.display()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file
    pub path: PathBuf,
    /// redb cache size in bytes
    pub cache_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let redb = RedbStorageConfig::default();
        Self {
            path: redb.db_path,
            cache_size: redb.cache_size,
        }
    }
}

impl StoreConfig {
    pub fn to_redb_config(&self) -> RedbStorageConfig {
        RedbStorageConfig::with_path(&self.path).with_cache_size(self.cache_size)
    }
}

#[derive(Parser)]
#[command(name = "vizmesh", about = "Registry of data sources and visualizations")]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Database path, overriding the configuration
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Load the configuration and apply command-line overrides
    pub fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(db) = &self.db {
            config.store.path = db.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.default_level = level.clone();
        }
        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register or overwrite a data source from a JSON file
    AddSource {
        /// JSON file, or - for stdin
        file: PathBuf,
    },
    /// Register or overwrite a visualization from a JSON file
    AddViz {
        /// JSON file, or - for stdin
        file: PathBuf,
    },
    /// Print the data points of a data source
    Points {
        /// Data source id
        id: String,
    },
    /// Print a data source
    Source {
        /// Data source id
        id: String,
    },
    /// Print a visualization
    Viz {
        /// Visualization id
        id: String,
    },
    /// Append data points (JSON array) to a data source
    Append {
        /// Data source id
        id: String,
        /// JSON file, or - for stdin
        file: PathBuf,
    },
    /// List all data sources and visualizations
    List,
    /// Delete a data source
    RemoveSource {
        /// Data source id
        id: String,
    },
    /// Delete a visualization
    RemoveViz {
        /// Visualization id
        id: String,
    },
}
