use std::path::PathBuf;
use thiserror::Error;

use harrow_utils::error::{ErrorCategory, UserFriendlyError};

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file {}: {reason}", path.display())]
    InvalidFile { path: PathBuf, reason: String },

    #[error("Cannot read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Invalid override '{0}': expected key=value")]
    MalformedOverride(String),

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile { path, reason } => {
                format!(
                    "Configuration file {} has invalid format: {reason}",
                    path.display()
                )
            }
            Self::Read { path, source } => {
                format!("Cannot read configuration file {}: {source}", path.display())
            }
            Self::NotFound { path } => {
                format!("Configuration file not found: {}", path.display())
            }
            Self::InvalidValue { key, reason } => {
                format!("Configuration '{key}' has invalid value: {reason}")
            }
            Self::UnknownKey(key) => format!("Unknown configuration key '{key}'"),
            Self::MalformedOverride(raw) => {
                format!("Override '{raw}' is not of the form key=value")
            }
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile { .. } | Self::UnknownKey(_) => Some(
                "Configuration files are TOML with top-level keys and [test_suites.<name>] tables."
                    .to_string(),
            ),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => Some(
                "harrow searches for .harrow/config.toml starting from the current directory upward."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnknownKey(_) | Self::MalformedOverride(_) => vec![
                "Valid keys: architecture, platform, parallelism, unprivileged_user, list_timeout, cleanup_timeout, work_root, store_dir, test_suites.<suite>.<var>".to_string(),
                "Run 'harrow config' to see the effective configuration".to_string(),
            ],
            Self::InvalidValue { key, .. } if key == "parallelism" => {
                vec!["Use a positive integer, e.g. -v parallelism=4".to_string()]
            }
            Self::NotFound { .. } => {
                vec!["Check the path given to --config".to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}
