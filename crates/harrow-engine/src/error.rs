//! Error types for the engine

use std::path::PathBuf;
use thiserror::Error;

use harrow_config::ConfigError;
use harrow_model::ModelError;
use harrow_runner::RunnerError;
use harrow_utils::error::{ErrorCategory, UserFriendlyError};

/// Malformed output from a test program's listing step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("{0}")]
    Format(String),
}

impl InterfaceError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown test interface '{0}'")]
    UnknownInterface(String),

    #[error("Test interface '{0}' is already registered")]
    DuplicateInterface(String),

    #[error(transparent)]
    Interface(#[from] InterfaceError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot create work directory {}: {source}", path.display())]
    WorkDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot remove {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot capture the current context: {0}")]
    Context(#[source] std::io::Error),

    #[error("Load of '{}' failed: {reason}", path.display())]
    Harrowfile { path: PathBuf, reason: String },

    #[error("Invalid filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("No test cases in flight")]
    NothingInFlight,

    #[error("Cannot install signal handler: {0}")]
    SignalHandler(String),

    #[error("Interrupted by signal")]
    Interrupted,
}

impl EngineError {
    pub(crate) fn harrowfile(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Harrowfile {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_filter(filter: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            filter: filter.to_string(),
            reason: reason.into(),
        }
    }
}

impl UserFriendlyError for EngineError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Harrowfile { .. } => Some(
                "A Harrowfile is TOML with [[test_program]] tables and optional include lists."
                    .to_string(),
            ),
            Self::InvalidFilter { .. } => Some(
                "Filters have the form path[:case-glob] with a relative path.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::UnknownInterface(_) => {
                vec!["Known interfaces: atf, plain, tap".to_string()]
            }
            Self::InvalidFilter { .. } => vec![
                "Remove overlapping filters such as 'dir' and 'dir/prog'".to_string(),
            ],
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Harrowfile { .. } | Self::UnknownInterface(_) | Self::DuplicateInterface(_) => {
                ErrorCategory::SuiteDefinition
            }
            Self::InvalidFilter { .. } => ErrorCategory::Configuration,
            Self::WorkDirectory { .. } | Self::Cleanup { .. } | Self::Context(_) => {
                ErrorCategory::FileSystem
            }
            Self::Interrupted => ErrorCategory::Interrupted,
            _ => ErrorCategory::Execution,
        }
    }
}
