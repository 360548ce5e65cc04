//! Programs whose exit status is the result of a single `main` case.

use std::path::Path;

use harrow_model::{TestCaseSpec, TestProgram, TestResult};
use harrow_runner::{CommandSpec, ProcessStatus};

use super::{TestInterface, Vars, describe_signal, env_exported_command};
use crate::error::InterfaceError;

/// Name of the only case of plain and TAP programs.
pub const MAIN_CASE: &str = "main";

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainInterface;

impl TestInterface for PlainInterface {
    fn list_command(&self, _program: &TestProgram, _vars: &Vars) -> Option<CommandSpec> {
        None
    }

    fn parse_list(
        &self,
        _status: Option<ProcessStatus>,
        _stdout: &Path,
        _stderr: &Path,
    ) -> Result<Vec<TestCaseSpec>, InterfaceError> {
        Ok(vec![TestCaseSpec::new(MAIN_CASE)])
    }

    fn test_command(
        &self,
        program: &TestProgram,
        _case_name: &str,
        vars: &Vars,
        _control_dir: &Path,
    ) -> CommandSpec {
        env_exported_command(program, vars)
    }

    fn compute_result(
        &self,
        status: Option<ProcessStatus>,
        _control_dir: &Path,
        _stdout: &Path,
        _stderr: &Path,
    ) -> TestResult {
        match status {
            None => TestResult::broken("Test case body timed out"),
            Some(ProcessStatus::Exited(0)) => TestResult::passed(),
            Some(ProcessStatus::Exited(code)) => {
                TestResult::failed(format!("Returned non-success exit status {code}"))
            }
            Some(status) => TestResult::broken(describe_signal(&status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harrow_model::{Metadata, TestCasesMap};
    use std::ffi::OsString;

    fn result(status: Option<ProcessStatus>) -> TestResult {
        let p = Path::new("/nonexistent");
        PlainInterface.compute_result(status, p, p, p)
    }

    #[test]
    fn test_results() {
        assert_eq!(result(Some(ProcessStatus::Exited(0))), TestResult::passed());
        assert_eq!(
            result(Some(ProcessStatus::Exited(8))),
            TestResult::failed("Returned non-success exit status 8")
        );
        assert_eq!(
            result(Some(ProcessStatus::Signaled {
                signal: 6,
                core_dumped: true
            })),
            TestResult::broken("Received signal 6 (core dumped)")
        );
        assert_eq!(result(None), TestResult::broken("Test case body timed out"));
    }

    #[test]
    fn test_single_main_case_without_listing() {
        let program = TestProgram::new(
            "plain",
            "bin/t",
            "/suite",
            "s",
            Metadata::default(),
            TestCasesMap::new(),
        );
        assert!(PlainInterface.list_command(&program, &Vars::new()).is_none());

        let p = Path::new("/nonexistent");
        let specs = PlainInterface.parse_list(None, p, p).unwrap();
        assert_eq!(specs, vec![TestCaseSpec::new(MAIN_CASE)]);
    }

    #[test]
    fn test_vars_exported_with_prefix() {
        let program = TestProgram::new(
            "plain",
            "bin/t",
            "/suite",
            "s",
            Metadata::default(),
            TestCasesMap::new(),
        );
        let vars = Vars::from([("host".to_string(), "db1".to_string())]);
        let cmd = PlainInterface.test_command(&program, MAIN_CASE, &vars, Path::new("/c"));

        assert_eq!(cmd.program, OsString::from("/suite/bin/t"));
        assert!(cmd.args.is_empty());
        assert_eq!(
            cmd.env.unwrap().get(&OsString::from("TEST_ENV_host")),
            Some(&OsString::from("db1"))
        );
    }
}
