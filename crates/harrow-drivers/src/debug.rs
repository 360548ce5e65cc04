//! The `debug` driver: run exactly one test case under a debugger.

use std::path::Path;
use std::sync::Arc;

use harrow_config::Config;
use harrow_engine::{Filter, FilterSet, ScanResult, Scanner, Scheduler, load_harrowfile};
use harrow_model::{Debugger, TestResult};
use harrow_utils::logging::driver_span;

use crate::error::DriverError;

fn single_match(scanner: &mut Scanner, filter: &Filter) -> Result<ScanResult, DriverError> {
    let Some(found) = scanner.yield_next() else {
        return Err(DriverError::NoMatch(filter.to_string()));
    };
    if scanner.yield_next().is_some() {
        return Err(DriverError::MultipleMatches(filter.to_string()));
    }
    Ok(found)
}

/// Run the one test case selected by `filter` with its output sent to
/// `stdout_path` and `stderr_path`.
pub fn debug_test(
    harrowfile: &Path,
    build_root: Option<&Path>,
    filter: Filter,
    config: &Config,
    debugger: Arc<dyn Debugger>,
    stdout_path: &Path,
    stderr_path: &Path,
) -> Result<TestResult, DriverError> {
    let span = driver_span("debug", &harrowfile.display().to_string());
    let _guard = span.enter();

    let mut scheduler = Scheduler::setup(config)?;
    let outcome = (|| -> Result<_, DriverError> {
        let programs = load_harrowfile(harrowfile, build_root, &scheduler, config)?;
        let mut scanner = Scanner::new(programs, FilterSet::new([filter.clone()])?);
        let found = single_match(&mut scanner, &filter)?;

        found
            .program
            .find(&found.case_name)?
            .attach_debugger(debugger)?;
        let handle = scheduler.debug_test(
            found.program,
            &found.case_name,
            config,
            stdout_path,
            stderr_path,
        )?;
        let result = handle.test_result().clone();
        handle.cleanup()?;
        Ok(result)
    })();
    let cleanup = scheduler.cleanup();
    let value = outcome?;
    cleanup?;
    Ok(value)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testing::Suite;
    use harrow_model::{TestProgram, TestResultType};
    use harrow_runner::ExitHandle;
    use harrow_utils::test_support::{atf_program_body, write_script};
    use serial_test::serial;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Record(Mutex<Vec<String>>);

    impl Debugger for Record {
        fn after_execution(&self, _program: &TestProgram, case_name: &str, exit: &ExitHandle) {
            if let Ok(mut events) = self.0.lock() {
                events.push(format!("{case_name} {:?}", exit.status));
            }
        }
    }

    fn suite() -> (Suite, std::path::PathBuf) {
        let suite = Suite::new(1);
        write_script(
            suite.dir.path(),
            "prog",
            &atf_program_body(&[
                ("alpha", &[], "echo to-out; echo passed > \"$resfile\""),
                ("beta", &[], "echo failed: nope > \"$resfile\"; exit 1"),
            ]),
        );
        let harrowfile = suite.harrowfile(
            "test_suite = \"s\"\n[[test_program]]\ninterface = \"atf\"\nname = \"prog\"\n",
        );
        (suite, harrowfile)
    }

    #[test]
    #[serial(interrupts)]
    fn test_debug_single_case() {
        let (suite, harrowfile) = suite();
        let out = TempDir::new().unwrap();
        let stdout = out.path().join("out");
        let stderr = out.path().join("err");
        let debugger = Arc::new(Record::default());

        let result = debug_test(
            &harrowfile,
            None,
            "prog:alpha".parse().unwrap(),
            &suite.config,
            debugger.clone(),
            &stdout,
            &stderr,
        )
        .unwrap();

        assert_eq!(result.kind(), TestResultType::Passed);
        assert_eq!(std::fs::read_to_string(&stdout).unwrap(), "to-out\n");
        let events = debugger.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("alpha Some("), "{events:?}");
    }

    #[test]
    #[serial(interrupts)]
    fn test_debug_requires_exactly_one_match() {
        let (suite, harrowfile) = suite();
        let out = TempDir::new().unwrap();
        let run = |filter: &str| {
            debug_test(
                &harrowfile,
                None,
                filter.parse().unwrap(),
                &suite.config,
                Arc::new(Record::default()),
                &out.path().join("out"),
                &out.path().join("err"),
            )
        };

        assert!(matches!(run("prog"), Err(DriverError::MultipleMatches(_))));
        assert!(matches!(run("prog:gamma"), Err(DriverError::NoMatch(_))));
        let err = run("other").unwrap_err();
        assert!(err.to_string().contains("No test cases match"));
    }
}
