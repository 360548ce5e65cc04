use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::ModelError;

/// Outcome category of a test case.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TestResultType {
    Broken,
    ExpectedFailure,
    Failed,
    Passed,
    Skipped,
}

impl TestResultType {
    /// Whether a result of this type counts as a success for the run.
    #[must_use]
    pub const fn is_good(self) -> bool {
        matches!(self, Self::ExpectedFailure | Self::Passed | Self::Skipped)
    }

    /// Parse a type name, reporting unknown names as a model error.
    pub fn parse(name: &str) -> Result<Self, ModelError> {
        name.parse()
            .map_err(|_| ModelError::UnknownResultType(name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(rename = "type")]
    kind: TestResultType,
    reason: String,
}

impl TestResult {
    #[must_use]
    pub fn new(kind: TestResultType, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn passed() -> Self {
        Self::new(TestResultType::Passed, "")
    }

    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(TestResultType::Failed, reason)
    }

    #[must_use]
    pub fn broken(reason: impl Into<String>) -> Self {
        Self::new(TestResultType::Broken, reason)
    }

    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::new(TestResultType::Skipped, reason)
    }

    #[must_use]
    pub fn expected_failure(reason: impl Into<String>) -> Self {
        Self::new(TestResultType::ExpectedFailure, reason)
    }

    #[must_use]
    pub fn kind(&self) -> TestResultType {
        self.kind
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    #[must_use]
    pub fn good(&self) -> bool {
        self.kind.is_good()
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.reason)
        }
    }
}
