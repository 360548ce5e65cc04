//! Error types for the result store

use std::path::PathBuf;
use thiserror::Error;

use harrow_model::ModelError;
use harrow_utils::error::{ErrorCategory, UserFriendlyError};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot open results file {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("Results file {} already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Unsupported schema version {found}; expected {expected}")]
    SchemaVersion { found: i64, expected: i64 },

    #[error("Corrupt results file: {0}")]
    Integrity(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path {} is not valid UTF-8 and cannot be stored", path.display())]
    NonUtf8Path { path: PathBuf },

    #[error("No previous results file found for test suite {}", root.display())]
    NoResultsFile { root: PathBuf },
}

impl StoreError {
    pub(crate) fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity(message.into())
    }
}

impl UserFriendlyError for StoreError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::SchemaVersion { .. } => Some(
                "The results file was written by an incompatible version of harrow.".to_string(),
            ),
            Self::NoResultsFile { .. } => Some(
                "Results files are created by 'harrow test' in the store directory.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NoResultsFile { .. } => vec![
                "Run 'harrow test' first".to_string(),
                "Pass --results-file to point at an existing file".to_string(),
            ],
            Self::AlreadyExists { .. } => {
                vec!["Choose a different --results-file".to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Io { .. } => ErrorCategory::FileSystem,
            _ => ErrorCategory::Storage,
        }
    }
}
