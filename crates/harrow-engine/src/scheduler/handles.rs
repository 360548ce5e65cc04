use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use harrow_model::{TestProgram, TestResult};
use harrow_runner::elapsed_between;

use crate::error::EngineError;

/// Correlates a spawned test case with its completion.
///
/// Tokens are issued in increasing order by one scheduler and never reuse an
/// operating system process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExecHandle(pub(crate) u64);

impl ExecHandle {
    #[must_use]
    pub fn token(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExecHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A finished execution owning its control directory until released.
///
/// [`cleanup`](Self::cleanup) consumes the handle; a handle dropped without
/// it leaves the directory behind and logs a warning.
#[derive(Debug)]
pub struct ResultHandle {
    original_pid: ExecHandle,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    control_directory: PathBuf,
    stdout_file: PathBuf,
    stderr_file: PathBuf,
    released: bool,
}

impl ResultHandle {
    pub(crate) fn new(
        original_pid: ExecHandle,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        control_directory: PathBuf,
        stdout_file: PathBuf,
        stderr_file: PathBuf,
    ) -> Self {
        Self {
            original_pid,
            start_time,
            end_time,
            control_directory,
            stdout_file,
            stderr_file,
            released: false,
        }
    }

    /// The handle returned by the spawn this result belongs to.
    #[must_use]
    pub fn original_pid(&self) -> ExecHandle {
        self.original_pid
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        elapsed_between(self.start_time, self.end_time)
    }

    /// Directory holding the case's work directory and captured output.
    #[must_use]
    pub fn work_directory(&self) -> &Path {
        &self.control_directory
    }

    #[must_use]
    pub fn stdout_file(&self) -> &Path {
        &self.stdout_file
    }

    #[must_use]
    pub fn stderr_file(&self) -> &Path {
        &self.stderr_file
    }

    /// Remove the control directory. A directory that is already gone, for
    /// instance after the scheduler removed its whole root, is not an error.
    pub fn cleanup(mut self) -> Result<(), EngineError> {
        self.released = true;
        match std::fs::remove_dir_all(&self.control_directory) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(EngineError::Cleanup {
                path: self.control_directory.clone(),
                source,
            }),
        }
    }
}

impl Drop for ResultHandle {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                handle = %self.original_pid,
                dir = %self.control_directory.display(),
                "result handle dropped without cleanup; leaking its directory"
            );
        }
    }
}

/// A [`ResultHandle`] for one test case together with its result.
#[derive(Debug)]
pub struct TestResultHandle {
    base: ResultHandle,
    program: Arc<TestProgram>,
    case_name: String,
    result: TestResult,
}

impl TestResultHandle {
    pub(crate) fn new(
        base: ResultHandle,
        program: Arc<TestProgram>,
        case_name: String,
        result: TestResult,
    ) -> Self {
        Self {
            base,
            program,
            case_name,
            result,
        }
    }

    #[must_use]
    pub fn test_program(&self) -> &Arc<TestProgram> {
        &self.program
    }

    #[must_use]
    pub fn test_case_name(&self) -> &str {
        &self.case_name
    }

    #[must_use]
    pub fn test_result(&self) -> &TestResult {
        &self.result
    }

    pub fn cleanup(self) -> Result<(), EngineError> {
        self.base.cleanup()
    }
}

impl Deref for TestResultHandle {
    type Target = ResultHandle;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}
