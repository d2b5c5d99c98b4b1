//! Logging setup for vizmesh
//!
//! Builds a global `tracing` subscriber from a [`LogConfig`]: console output
//! to stderr (pretty or JSONL) and optional JSONL file output with rotation.
//! `RUST_LOG` takes precedence over the configured level.
//!
//! # Quick Start
//!
//! ```ignore
//! use vizmesh_logging::{LogConfig, VizmeshSubscriberBuilder};
//!
//! // Pretty console output at info
//! let _guard = VizmeshSubscriberBuilder::new().try_init()?;
//!
//! // Settings from the `[logging]` section of the config file
//! let config: LogConfig = app_config.logging;
//! let _guard = VizmeshSubscriberBuilder::new().with_config(config).try_init()?;
//! ```
//!
//! Keep the returned guard alive for as long as file output should be
//! flushed.

pub mod config;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, LogConfig, RotationStrategy};

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors that can occur while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log file or directory could not be created
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rolling file appender could not be created
    #[error("File appender error: {0}")]
    Appender(#[from] InitError),

    /// A global subscriber is already installed
    #[error("Subscriber init error: {0}")]
    Init(String),
}

/// Builder for configuring and initializing the vizmesh logging subscriber
pub struct VizmeshSubscriberBuilder {
    config: LogConfig,
}

impl VizmeshSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Install the subscriber globally
    ///
    /// Returns the file writer guard when file output is configured.
    ///
    /// # Errors
    ///
    /// Fails if the log file can't be created or a global subscriber is
    /// already set.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let (file_writer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = create_file_writer(file_config)?;
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        let registry = Registry::default().with(env_filter);
        let console = &self.config.console;

        // Separate arms per layer combination to satisfy the type system
        let result = match (console.enabled, console.pretty, file_writer) {
            (true, true, Some(writer)) => registry
                .with(layers::pretty_layer(console.ansi))
                .with(layers::jsonl_layer(writer))
                .try_init(),
            (true, false, Some(writer)) => registry
                .with(layers::jsonl_layer(std::io::stderr))
                .with(layers::jsonl_layer(writer))
                .try_init(),
            (true, true, None) => registry.with(layers::pretty_layer(console.ansi)).try_init(),
            (true, false, None) => registry.with(layers::jsonl_layer(std::io::stderr)).try_init(),
            (false, _, Some(writer)) => registry.with(layers::jsonl_layer(writer)).try_init(),
            (false, _, None) => registry.try_init(),
        };

        result.map_err(|e| LoggingError::Init(e.to_string()))?;
        Ok(guard)
    }

    /// Install the subscriber, reporting failure on stderr instead of
    /// returning it
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }
}

impl Default for VizmeshSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a non-blocking file writer
///
/// `Never` rotation truncates a single file; other strategies append to
/// rolling files.
fn create_file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let file_path = config.directory.join(format!("{}.log", config.prefix));
            let file = File::create(&file_path)?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.clone())
        .filename_suffix("log");
    if let Some(max_files) = config.max_files {
        builder = builder.max_log_files(max_files);
    }
    let appender = builder.build(&config.directory)?;

    Ok(tracing_appender::non_blocking(appender))
}
