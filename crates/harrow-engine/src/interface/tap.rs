//! Programs reporting a single `main` case through TAP on stdout.

use std::path::Path;

use harrow_model::{TestCaseSpec, TestProgram, TestResult};
use harrow_runner::{CommandSpec, ProcessStatus};

use super::plain::MAIN_CASE;
use super::tap_parser::parse_tap_output;
use super::{TestInterface, Vars, describe_signal, env_exported_command};
use crate::error::InterfaceError;

#[derive(Debug, Clone, Copy, Default)]
pub struct TapInterface;

impl TestInterface for TapInterface {
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
        stdout: &Path,
        _stderr: &Path,
    ) -> TestResult {
        let status = match status {
            None => return TestResult::broken("Test case body timed out"),
            Some(status @ ProcessStatus::Signaled { .. }) => {
                return TestResult::broken(describe_signal(&status));
            }
            Some(status) => status,
        };

        let output = match std::fs::read_to_string(stdout) {
            Ok(output) => output,
            Err(e) => {
                return TestResult::broken(format!(
                    "Cannot read TAP output {}: {e}",
                    stdout.display()
                ));
            }
        };
        let summary = match parse_tap_output(&output) {
            Ok(summary) => summary,
            Err(e) => return TestResult::broken(format!("TAP test program yielded invalid data: {e}")),
        };

        if summary.bailed_out {
            return TestResult::failed("Bailed out");
        }
        if let Some(reason) = summary.all_skipped_reason {
            return TestResult::skipped(reason);
        }
        if summary.not_ok_count == 0 {
            return match status.exit_code() {
                Some(0) => TestResult::passed(),
                code => TestResult::broken(format!(
                    "Dubious test program: reported all tests as passed but returned exit code {}",
                    code.unwrap_or_default()
                )),
            };
        }
        TestResult::failed(format!(
            "{} of {} tests failed",
            summary.not_ok_count,
            summary.ok_count + summary.not_ok_count
        ))
    }
}
