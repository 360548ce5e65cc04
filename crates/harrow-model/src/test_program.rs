use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::error::ModelError;
use crate::metadata::Metadata;
use crate::result::TestResult;
use crate::test_case::{TestCase, TestCaseSpec, TestCasesMap};

/// Name of the pseudo test case standing in for a failed listing.
pub const LIST_FAILURE_CASE: &str = "__test_cases_list__";

const LIST_FAILURE_DESCRIPTION: &str = "Represents the correct processing of the test cases list";

/// Source of a lazy program's test cases.
pub trait TestCaseLister: Send + Sync {
    /// Produce the effective test cases of `program`.
    fn list_test_cases(&self, program: &TestProgram) -> Result<TestCasesMap, ModelError>;
}

/// An executable exposing test cases through a named test interface.
pub struct TestProgram {
    interface_name: String,
    relative_path: PathBuf,
    root: PathBuf,
    test_suite_name: String,
    metadata: Metadata,
    cases: OnceLock<TestCasesMap>,
    lister: Option<Arc<dyn TestCaseLister>>,
}

impl TestProgram {
    /// A program whose test cases are already known.
    #[must_use]
    pub fn new(
        interface_name: impl Into<String>,
        relative_path: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        test_suite_name: impl Into<String>,
        metadata: Metadata,
        cases: TestCasesMap,
    ) -> Self {
        Self {
            interface_name: interface_name.into(),
            relative_path: relative_path.into(),
            root: root.into(),
            test_suite_name: test_suite_name.into(),
            metadata,
            cases: OnceLock::from(cases),
            lister: None,
        }
    }

    /// A program that asks `lister` for its test cases on first use.
    #[must_use]
    pub fn lazy(
        interface_name: impl Into<String>,
        relative_path: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        test_suite_name: impl Into<String>,
        metadata: Metadata,
        lister: Arc<dyn TestCaseLister>,
    ) -> Self {
        Self {
            interface_name: interface_name.into(),
            relative_path: relative_path.into(),
            root: root.into(),
            test_suite_name: test_suite_name.into(),
            metadata,
            cases: OnceLock::new(),
            lister: Some(lister),
        }
    }

    #[must_use]
    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn absolute_path(&self) -> PathBuf {
        self.root.join(&self.relative_path)
    }

    #[must_use]
    pub fn test_suite_name(&self) -> &str {
        &self.test_suite_name
    }

    /// Program-level defaults for all of its test cases.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Whether the case list has been fetched already.
    #[must_use]
    pub fn is_listed(&self) -> bool {
        self.cases.get().is_some()
    }

    /// The program's test cases, listing them on first access.
    ///
    /// A failed listing is cached as a single broken [`LIST_FAILURE_CASE`]
    /// carrying the failure reason, so the program still shows up in results.
    pub fn test_cases(&self) -> &TestCasesMap {
        self.cases.get_or_init(|| {
            let Some(lister) = &self.lister else {
                return TestCasesMap::new();
            };
            match lister.list_test_cases(self) {
                Ok(cases) => cases,
                Err(err) => {
                    let reason = match err {
                        ModelError::ListingFailed(reason) => reason,
                        other => other.to_string(),
                    };
                    tracing::warn!(
                        program = %self.relative_path.display(),
                        %reason,
                        "test case listing failed"
                    );
                    self.list_failure(reason)
                }
            }
        })
    }

    fn list_failure(&self, reason: String) -> TestCasesMap {
        let mut metadata = self.metadata.clone();
        metadata.description = LIST_FAILURE_DESCRIPTION.to_string();
        let case = TestCase::fake(LIST_FAILURE_CASE, metadata, TestResult::broken(reason));
        TestCasesMap::from([(LIST_FAILURE_CASE.to_string(), case)])
    }

    pub fn find(&self, name: &str) -> Result<&TestCase, ModelError> {
        self.test_cases()
            .get(name)
            .ok_or_else(|| ModelError::UnknownTestCase {
                program: self.relative_path.clone(),
                case: name.to_string(),
            })
    }

    /// Resolve listed cases against this program's defaults.
    pub fn resolve_cases(&self, specs: Vec<TestCaseSpec>) -> Result<TestCasesMap, ModelError> {
        let mut cases = TestCasesMap::new();
        for spec in specs {
            let metadata = spec.overrides.apply(&self.metadata)?;
            cases.insert(spec.name.clone(), TestCase::new(spec.name, metadata));
        }
        Ok(cases)
    }
}

impl PartialEq for TestProgram {
    fn eq(&self, other: &Self) -> bool {
        self.interface_name == other.interface_name
            && self.relative_path == other.relative_path
            && self.root == other.root
            && self.test_suite_name == other.test_suite_name
            && self.metadata == other.metadata
            && self.test_cases() == other.test_cases()
    }
}

impl fmt::Debug for TestProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestProgram")
            .field("interface_name", &self.interface_name)
            .field("relative_path", &self.relative_path)
            .field("root", &self.root)
            .field("test_suite_name", &self.test_suite_name)
            .field("metadata", &self.metadata)
            .field("cases", &self.cases.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MetadataBuilder, MetadataOverrides};
    use crate::result::TestResultType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingLister {
        calls: AtomicUsize,
        outcome: Result<Vec<TestCaseSpec>, String>,
    }

    impl TestCaseLister for CountingLister {
        fn list_test_cases(&self, program: &TestProgram) -> Result<TestCasesMap, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Ok(specs) => program.resolve_cases(specs.clone()),
                Err(reason) => Err(ModelError::ListingFailed(reason.clone())),
            }
        }
    }

    fn lazy_program(lister: Arc<CountingLister>) -> TestProgram {
        let metadata = MetadataBuilder::new()
            .set("timeout", "10")
            .unwrap()
            .build();
        TestProgram::lazy("atf", "dir/prog", "/suite", "suite", metadata, lister)
    }

    #[test]
    fn test_lists_once_and_applies_defaults() {
        let mut overrides = MetadataOverrides::new();
        overrides.insert("is_exclusive", "true").unwrap();
        let lister = Arc::new(CountingLister {
            calls: AtomicUsize::new(0),
            outcome: Ok(vec![
                TestCaseSpec::new("a"),
                TestCaseSpec::with_overrides("b", overrides),
            ]),
        });
        let program = lazy_program(Arc::clone(&lister));

        assert!(!program.is_listed());
        assert_eq!(program.test_cases().len(), 2);
        assert_eq!(program.test_cases().len(), 2);
        assert_eq!(lister.calls.load(Ordering::SeqCst), 1);

        let b = program.find("b").unwrap();
        assert!(b.metadata().is_exclusive);
        assert_eq!(b.metadata().timeout, Duration::from_secs(10));
        assert!(!program.find("a").unwrap().metadata().is_exclusive);
    }

    #[test]
    fn test_listing_failure_becomes_fake_case() {
        let lister = Arc::new(CountingLister {
            calls: AtomicUsize::new(0),
            outcome: Err("Test program received signal 11".to_string()),
        });
        let program = lazy_program(lister);

        let cases = program.test_cases();
        assert_eq!(cases.len(), 1);
        let fake = program.find(LIST_FAILURE_CASE).unwrap();
        let result = fake.fake_result().unwrap();
        assert_eq!(result.kind(), TestResultType::Broken);
        assert!(result.reason().contains("received signal"));
        assert_eq!(fake.metadata().description, LIST_FAILURE_DESCRIPTION);
    }

    #[test]
    fn test_find_unknown_case() {
        let program = TestProgram::new(
            "plain",
            "p",
            "/root",
            "s",
            Metadata::default(),
            TestCasesMap::new(),
        );
        assert!(matches!(
            program.find("main"),
            Err(ModelError::UnknownTestCase { .. })
        ));
        assert_eq!(program.absolute_path(), PathBuf::from("/root/p"));
    }
}
