//! Test interfaces: the protocols test programs speak.
//!
//! An interface turns "list this program" and "run this case" into argv-only
//! [`CommandSpec`]s and maps what the child left behind into a
//! [`TestResult`]. Interfaces hold no state between calls; the scheduler
//! owns every process they describe.

use std::collections::BTreeMap;
use std::path::Path;

use harrow_model::{TestCaseSpec, TestProgram, TestResult};
use harrow_runner::{CommandSpec, ProcessStatus};

use crate::error::InterfaceError;

pub mod atf;
mod atf_list;
mod atf_result;
pub mod plain;
mod registry;
pub mod tap;
mod tap_parser;

pub use registry::InterfaceRegistry;
pub use tap_parser::{TapSummary, parse_tap_output};

/// Test suite variables handed to a program.
pub type Vars = BTreeMap<String, String>;

/// Prefix under which plain and TAP programs receive suite variables.
pub const TEST_ENV_PREFIX: &str = "TEST_ENV_";

pub trait TestInterface: Send + Sync {
    /// Command that makes `program` print its test case list, or `None` when
    /// the interface knows the list without running anything.
    fn list_command(&self, program: &TestProgram, vars: &Vars) -> Option<CommandSpec>;

    /// Turn the captured listing output into case specs.
    ///
    /// `status` is `None` when the listing timed out. When
    /// [`list_command`](Self::list_command) returned `None` the output files
    /// may not exist.
    fn parse_list(
        &self,
        status: Option<ProcessStatus>,
        stdout: &Path,
        stderr: &Path,
    ) -> Result<Vec<TestCaseSpec>, InterfaceError>;

    /// Command running the body of one test case.
    fn test_command(
        &self,
        program: &TestProgram,
        case_name: &str,
        vars: &Vars,
        control_dir: &Path,
    ) -> CommandSpec;

    /// Command running the cleanup step of one test case, if it has one.
    fn cleanup_command(
        &self,
        _program: &TestProgram,
        _case_name: &str,
        _vars: &Vars,
        _control_dir: &Path,
    ) -> Option<CommandSpec> {
        None
    }

    /// Map the body's termination (`None` for a timeout) to a result.
    fn compute_result(
        &self,
        status: Option<ProcessStatus>,
        control_dir: &Path,
        stdout: &Path,
        stderr: &Path,
    ) -> TestResult;
}

/// `program` with suite variables exported as `TEST_ENV_<name>`.
pub(crate) fn env_exported_command(program: &TestProgram, vars: &Vars) -> CommandSpec {
    CommandSpec::new(program.absolute_path()).envs(
        vars.iter()
            .map(|(name, value)| (format!("{TEST_ENV_PREFIX}{name}"), value.clone())),
    )
}

/// Describe a non-successful termination the way results report it.
pub(crate) fn describe_signal(status: &ProcessStatus) -> String {
    let mut text = format!("Received signal {}", status.term_signal().unwrap_or_default());
    if status.core_dumped() {
        text.push_str(" (core dumped)");
    }
    text
}
