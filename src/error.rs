//! Top-level error type of the harrow binary and library facade.

use thiserror::Error;

use harrow_config::ConfigError;
use harrow_drivers::DriverError;
use harrow_engine::EngineError;
use harrow_store::StoreError;
use harrow_utils::error::{ErrorCategory, UserFriendlyError};
use harrow_utils::exit_codes::ExitCode;

#[derive(Error, Debug)]
pub enum HarrowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Driver(DriverError),

    #[error("Interrupted by signal")]
    Interrupted,
}

impl From<EngineError> for HarrowError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Interrupted => Self::Interrupted,
            EngineError::Config(config) => Self::Config(config),
            other => Self::Engine(other),
        }
    }
}

impl From<DriverError> for HarrowError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Interrupted => Self::Interrupted,
            DriverError::Engine(engine) => engine.into(),
            DriverError::Store(store) => Self::Store(store),
            other => Self::Driver(other),
        }
    }
}

fn engine_exit_code(err: &EngineError) -> ExitCode {
    match err {
        EngineError::Config(_)
        | EngineError::Harrowfile { .. }
        | EngineError::InvalidFilter { .. }
        | EngineError::UnknownInterface(_)
        | EngineError::Model(_) => ExitCode::CLI_ARGS,
        EngineError::Interrupted => ExitCode::INTERRUPTED,
        _ => ExitCode::INTERNAL,
    }
}

impl HarrowError {
    /// Process exit code for this error.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Engine(err) => engine_exit_code(err),
            Self::Store(StoreError::NoResultsFile { .. } | StoreError::AlreadyExists { .. }) => {
                ExitCode::CLI_ARGS
            }
            Self::Store(_) => ExitCode::INTERNAL,
            Self::Driver(DriverError::NoMatch(_) | DriverError::MultipleMatches(_)) => {
                ExitCode::CLI_ARGS
            }
            Self::Driver(DriverError::Model(_)) => ExitCode::CLI_ARGS,
            Self::Driver(_) => ExitCode::INTERNAL,
            Self::Interrupted => ExitCode::INTERRUPTED,
        }
    }
}

impl UserFriendlyError for HarrowError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Engine(e) => e.user_message(),
            Self::Store(e) => e.user_message(),
            Self::Driver(e) => e.user_message(),
            Self::Interrupted => "Interrupted by signal; results recorded so far were kept".to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Engine(e) => e.context(),
            Self::Store(e) => e.context(),
            Self::Driver(e) => e.context(),
            Self::Interrupted => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Engine(e) => e.suggestions(),
            Self::Store(e) => e.suggestions(),
            Self::Driver(e) => e.suggestions(),
            Self::Interrupted => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(e) => e.category(),
            Self::Engine(e) => e.category(),
            Self::Store(e) => e.category(),
            Self::Driver(e) => e.category(),
            Self::Interrupted => ErrorCategory::Interrupted,
        }
    }
}
