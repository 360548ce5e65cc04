use harrow_runner::{CommandSpec, ExitHandle};

use crate::test_program::TestProgram;

/// Hooks into the execution of a single test case run under `debug`.
pub trait Debugger: Send + Sync {
    /// Called right before the test body is spawned.
    fn before_calling(&self, _program: &TestProgram, _case_name: &str, _command: &CommandSpec) {}

    /// Called after the body finished and before its cleanup step, while the
    /// work directory still exists.
    fn after_execution(&self, program: &TestProgram, case_name: &str, exit: &ExitHandle);
}
