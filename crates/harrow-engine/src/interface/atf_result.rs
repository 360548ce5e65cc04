//! Result files written by ATF test cases and their reconciliation with the
//! observed exit status.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use harrow_model::TestResult;
use harrow_runner::ProcessStatus;

/// Result file name inside the control directory.
pub(crate) const RESULT_FILE: &str = "result.atf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AtfResult {
    Passed,
    Failed(String),
    Skipped(String),
    Broken(String),
    ExpectedFailure(String),
    ExpectedDeath(String),
    ExpectedExit(Option<i32>, String),
    ExpectedSignal(Option<i32>, String),
    ExpectedTimeout(String),
}

impl AtfResult {
    /// Parse the contents of a result file.
    pub(crate) fn parse(contents: &str) -> Result<Self, String> {
        if contents.is_empty() {
            return Err("Empty test result or no new line".to_string());
        }
        let mut lines = contents.lines();
        let line = lines.next().unwrap_or_default();
        if lines.any(|extra| !extra.is_empty()) {
            return Err(format!("Test result contains multiple lines: {contents}"));
        }

        let (head, reason) = match line.split_once(": ") {
            Some((head, reason)) => (head, Some(reason.to_string())),
            None => (line, None),
        };
        let (kind, arg) = match head.split_once('(') {
            Some((kind, rest)) => {
                let raw = rest
                    .strip_suffix(')')
                    .ok_or_else(|| format!("Malformed argument in '{line}'"))?;
                let value: i32 = raw
                    .parse()
                    .map_err(|_| format!("Invalid integer argument '{raw}' in '{line}'"))?;
                (kind, Some(value))
            }
            None => (head, None),
        };

        let need_reason = |reason: Option<String>| {
            reason
                .filter(|r| !r.is_empty())
                .ok_or_else(|| format!("Test result '{kind}' must be followed by a reason"))
        };
        let no_arg = |arg: Option<i32>| match arg {
            Some(_) => Err(format!("Test result '{kind}' does not take an argument")),
            None => Ok(()),
        };

        match kind {
            "passed" => {
                no_arg(arg)?;
                if reason.is_some() {
                    return Err("Test result 'passed' cannot have a reason".to_string());
                }
                Ok(Self::Passed)
            }
            "failed" => no_arg(arg).and_then(|()| need_reason(reason).map(Self::Failed)),
            "skipped" => no_arg(arg).and_then(|()| need_reason(reason).map(Self::Skipped)),
            "broken" => no_arg(arg).and_then(|()| need_reason(reason).map(Self::Broken)),
            "expected_failure" => {
                no_arg(arg).and_then(|()| need_reason(reason).map(Self::ExpectedFailure))
            }
            "expected_death" => {
                no_arg(arg).and_then(|()| need_reason(reason).map(Self::ExpectedDeath))
            }
            "expected_timeout" => {
                no_arg(arg).and_then(|()| need_reason(reason).map(Self::ExpectedTimeout))
            }
            "expected_exit" => need_reason(reason).map(|r| Self::ExpectedExit(arg, r)),
            "expected_signal" => need_reason(reason).map(|r| Self::ExpectedSignal(arg, r)),
            other => Err(format!("Unknown test result '{other}'")),
        }
    }

    /// Reconcile the reported result with how the body actually ended.
    pub(crate) fn apply(self, status: Option<ProcessStatus>) -> TestResult {
        let Some(status) = status else {
            return match self {
                Self::ExpectedTimeout(reason) => TestResult::expected_failure(reason),
                _ => TestResult::broken("Test case body timed out"),
            };
        };

        match self {
            Self::Passed => match status {
                ProcessStatus::Exited(0) => TestResult::passed(),
                other => TestResult::broken(format!(
                    "Passed test case should have exited cleanly but {}",
                    Termination(&other)
                )),
            },
            Self::Failed(reason) => match status {
                ProcessStatus::Exited(1) => TestResult::failed(reason),
                other => TestResult::broken(format!(
                    "Failed test case should have exited with code 1 but {}",
                    Termination(&other)
                )),
            },
            Self::Skipped(reason) => match status {
                ProcessStatus::Exited(0) => TestResult::skipped(reason),
                other => TestResult::broken(format!(
                    "Skipped test case should have exited cleanly but {}",
                    Termination(&other)
                )),
            },
            Self::Broken(reason) => TestResult::broken(reason),
            Self::ExpectedFailure(reason) => match status {
                ProcessStatus::Exited(0) => TestResult::expected_failure(reason),
                other => TestResult::broken(format!(
                    "Expected failure should have exited cleanly but {}",
                    Termination(&other)
                )),
            },
            Self::ExpectedDeath(reason) => TestResult::expected_failure(reason),
            Self::ExpectedExit(expected, reason) => match (status, expected) {
                (ProcessStatus::Exited(_), None) => TestResult::expected_failure(reason),
                (ProcessStatus::Exited(code), Some(want)) if code == want => {
                    TestResult::expected_failure(reason)
                }
                (other, Some(want)) => TestResult::broken(format!(
                    "Expected exit with code {want} but {}",
                    Termination(&other)
                )),
                (other, None) => TestResult::broken(format!(
                    "Expected clean exit but {}",
                    Termination(&other)
                )),
            },
            Self::ExpectedSignal(expected, reason) => match (status, expected) {
                (ProcessStatus::Signaled { .. }, None) => TestResult::expected_failure(reason),
                (ProcessStatus::Signaled { signal, .. }, Some(want)) if signal == want => {
                    TestResult::expected_failure(reason)
                }
                (other, Some(want)) => TestResult::broken(format!(
                    "Expected signal {want} but {}",
                    Termination(&other)
                )),
                (other, None) => TestResult::broken(format!(
                    "Expected program to receive a signal but {}",
                    Termination(&other)
                )),
            },
            Self::ExpectedTimeout(_) => TestResult::broken(format!(
                "Expected timeout but {}",
                Termination(&status)
            )),
        }
    }
}

/// "exited with code N" / "received signal N", as used inside reasons.
struct Termination<'a>(&'a ProcessStatus);

impl fmt::Display for Termination<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the final result of a body from its result file and status.
pub(crate) fn calculate_atf_result(status: Option<ProcessStatus>, result_file: &Path) -> TestResult {
    let contents = match std::fs::read_to_string(result_file) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return match status {
                None => TestResult::broken("Test case body timed out"),
                Some(status) => TestResult::broken(format!(
                    "Premature exit; test case {}",
                    Termination(&status)
                )),
            };
        }
        Err(e) => {
            return TestResult::broken(format!(
                "Unable to read test result file {}: {e}",
                result_file.display()
            ));
        }
    };

    match AtfResult::parse(&contents) {
        Ok(result) => result.apply(status),
        Err(reason) => match status {
            None => TestResult::broken("Test case body timed out"),
            Some(_) => TestResult::broken(format!("Invalid test case result file: {reason}")),
        },
    }
}
