//! Error types for the drivers

use thiserror::Error;

use harrow_engine::EngineError;
use harrow_model::ModelError;
use harrow_store::StoreError;
use harrow_utils::error::{ErrorCategory, UserFriendlyError};

#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Engine(EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("No test cases match the filter '{0}'")]
    NoMatch(String),

    #[error("The filter '{0}' matches more than one test case")]
    MultipleMatches(String),

    #[error("Interrupted by signal")]
    Interrupted,
}

impl From<EngineError> for DriverError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Interrupted => Self::Interrupted,
            other => Self::Engine(other),
        }
    }
}

impl UserFriendlyError for DriverError {
    fn user_message(&self) -> String {
        match self {
            Self::Engine(e) => e.user_message(),
            Self::Store(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Engine(e) => e.context(),
            Self::Store(e) => e.context(),
            Self::MultipleMatches(_) => {
                Some("The debug command runs exactly one test case.".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Engine(e) => e.suggestions(),
            Self::Store(e) => e.suggestions(),
            Self::NoMatch(_) => vec!["Use 'harrow list' to see the available test cases".to_string()],
            Self::MultipleMatches(_) => {
                vec!["Name a single test case as program:case".to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Engine(e) => e.category(),
            Self::Store(e) => e.category(),
            Self::Model(_) => ErrorCategory::SuiteDefinition,
            Self::NoMatch(_) | Self::MultipleMatches(_) => ErrorCategory::Configuration,
            Self::Interrupted => ErrorCategory::Interrupted,
        }
    }
}
