//! Logging settings as they appear under `[logging]` in `vizmesh.toml`
//!
//! Missing keys fall back to defaults; unknown keys are rejected so a typo in
//! the config file doesn't silently change nothing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Logging settings for the vizmesh binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. "info" or
    /// "vizmesh_registry=debug"
    pub default_level: String,

    /// Output on stderr
    pub console: ConsoleConfig,

    /// JSONL log files; disabled when absent
    pub file: Option<FileConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
        }
    }
}

/// Stderr output
///
/// Stdout is reserved for command results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Human-readable lines; JSONL when false
    pub pretty: bool,
    /// Colorize pretty output
    pub ansi: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: true,
            ansi: false,
        }
    }
}

/// JSONL file output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Created on startup if missing
    pub directory: PathBuf,
    /// Files are named `<prefix>.log`, or `<prefix>.<date>.log` when rotating
    pub prefix: String,
    pub rotation: RotationStrategy,
    /// Rotated files kept before the oldest is removed; unlimited when absent
    pub max_files: Option<usize>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "vizmesh".to_string(),
            rotation: RotationStrategy::Daily,
            max_files: Some(7),
        }
    }
}

/// When to start a new log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One file, truncated at startup
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.default_level, "info");
        assert!(config.console.enabled);
        assert!(config.console.pretty);
        assert!(!config.console.ansi);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: LogConfig = serde_json::from_str(
            r#"{"default_level": "trace", "file": {"rotation": "never"}}"#,
        )
        .unwrap();

        assert_eq!(config.default_level, "trace");
        assert!(config.console.enabled);
        let file = config.file.unwrap();
        assert_eq!(file.rotation, RotationStrategy::Never);
        assert_eq!(file.prefix, "vizmesh");
        assert_eq!(file.max_files, Some(7));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = serde_json::from_str::<LogConfig>(r#"{"jsonl": {"flatten_events": false}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("jsonl"));

        assert!(serde_json::from_str::<LogConfig>(r#"{"console": {"colour": true}}"#).is_err());
    }
}
