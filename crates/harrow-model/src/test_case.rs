use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::debugger::Debugger;
use crate::error::ModelError;
use crate::metadata::{Metadata, MetadataOverrides};
use crate::result::TestResult;

/// Test cases of one program, keyed by name.
pub type TestCasesMap = BTreeMap<String, TestCase>;

/// A test case as reported by a listing, before program defaults apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseSpec {
    pub name: String,
    pub overrides: MetadataOverrides,
}

impl TestCaseSpec {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overrides: MetadataOverrides::new(),
        }
    }

    #[must_use]
    pub fn with_overrides(name: impl Into<String>, overrides: MetadataOverrides) -> Self {
        Self {
            name: name.into(),
            overrides,
        }
    }
}

/// One runnable unit of a test program, carrying its effective metadata.
pub struct TestCase {
    name: String,
    metadata: Metadata,
    fake_result: Option<TestResult>,
    debugger: OnceLock<Arc<dyn Debugger>>,
}

impl TestCase {
    #[must_use]
    pub fn new(name: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            name: name.into(),
            metadata,
            fake_result: None,
            debugger: OnceLock::new(),
        }
    }

    /// A synthesized case that completes with `result` without running.
    #[must_use]
    pub fn fake(name: impl Into<String>, metadata: Metadata, result: TestResult) -> Self {
        Self {
            fake_result: Some(result),
            ..Self::new(name, metadata)
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    #[must_use]
    pub fn fake_result(&self) -> Option<&TestResult> {
        self.fake_result.as_ref()
    }

    /// Attach a debugger; a case accepts at most one.
    pub fn attach_debugger(&self, debugger: Arc<dyn Debugger>) -> Result<(), ModelError> {
        self.debugger
            .set(debugger)
            .map_err(|_| ModelError::DebuggerAlreadyAttached(self.name.clone()))
    }

    #[must_use]
    pub fn debugger(&self) -> Option<Arc<dyn Debugger>> {
        self.debugger.get().cloned()
    }
}

impl Clone for TestCase {
    /// Clones drop any attached debugger.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            metadata: self.metadata.clone(),
            fake_result: self.fake_result.clone(),
            debugger: OnceLock::new(),
        }
    }
}

impl PartialEq for TestCase {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.metadata == other.metadata
            && self.fake_result == other.fake_result
    }
}

impl Eq for TestCase {}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .field("fake_result", &self.fake_result)
            .field("has_debugger", &self.debugger.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_program::TestProgram;
    use harrow_runner::ExitHandle;

    struct NoopDebugger;

    impl Debugger for NoopDebugger {
        fn after_execution(&self, _: &TestProgram, _: &str, _: &ExitHandle) {}
    }

    #[test]
    fn test_fake_case_carries_result() {
        let case = TestCase::fake("__x__", Metadata::default(), TestResult::broken("no"));
        assert_eq!(case.fake_result(), Some(&TestResult::broken("no")));
        assert!(TestCase::new("a", Metadata::default()).fake_result().is_none());
    }

    #[test]
    fn test_debugger_attaches_once() {
        let case = TestCase::new("a", Metadata::default());
        assert!(case.debugger().is_none());
        case.attach_debugger(Arc::new(NoopDebugger)).unwrap();
        assert!(case.debugger().is_some());
        assert_eq!(
            case.attach_debugger(Arc::new(NoopDebugger)).unwrap_err(),
            ModelError::DebuggerAlreadyAttached("a".to_string())
        );
    }

    #[test]
    fn test_equality_ignores_debugger() {
        let a = TestCase::new("a", Metadata::default());
        let b = a.clone();
        a.attach_debugger(Arc::new(NoopDebugger)).unwrap();
        assert_eq!(a, b);
        assert!(b.debugger().is_none());
    }
}
