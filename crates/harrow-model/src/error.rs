use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown metadata property '{0}'")]
    UnknownProperty(String),

    #[error("Invalid value '{value}' for metadata property '{property}': {reason}")]
    InvalidValue {
        property: String,
        value: String,
        reason: String,
    },

    #[error("Unknown test case '{case}' in test program {}", program.display())]
    UnknownTestCase { program: PathBuf, case: String },

    #[error("A debugger is already attached to test case '{0}'")]
    DebuggerAlreadyAttached(String),

    #[error("Unknown test result type '{0}'")]
    UnknownResultType(String),

    #[error("Failed to list test cases: {0}")]
    ListingFailed(String),
}

impl ModelError {
    pub(crate) fn invalid(property: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            property: property.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
