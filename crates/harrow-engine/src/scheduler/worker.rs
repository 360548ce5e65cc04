use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use harrow_model::{TestProgram, TestResult};
use harrow_runner::{
    CommandSpec, OutputFiles, ProcessStatus, RunnerError, SpawnedChild, spawn, terminate_group,
};

use super::handles::ExecHandle;
use crate::interface::{TestInterface, Vars};

/// Process groups currently running, by handle.
pub(crate) type LivePids = Arc<Mutex<HashMap<ExecHandle, u32>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CleanupOutcome {
    NotNeeded,
    Skipped,
    Succeeded,
    TimedOut,
    Failed(String),
}

#[derive(Debug)]
pub(crate) enum Outcome {
    Finished {
        status: Option<ProcessStatus>,
        cleanup: CleanupOutcome,
    },
    Precomputed(TestResult),
}

#[derive(Debug)]
pub(crate) struct Completion {
    pub(crate) handle: ExecHandle,
    pub(crate) outcome: Outcome,
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
}

/// Paths of one execution under the scheduler root.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub(crate) control: PathBuf,
    pub(crate) work: PathBuf,
    pub(crate) stdout: PathBuf,
    pub(crate) stderr: PathBuf,
}

impl Layout {
    pub(crate) fn new(control: PathBuf) -> Self {
        Self {
            work: control.join("work"),
            stdout: control.join("stdout.txt"),
            stderr: control.join("stderr.txt"),
            control,
        }
    }
}

pub(crate) fn register(live: &LivePids, handle: ExecHandle, pid: u32) {
    if let Ok(mut live) = live.lock() {
        live.insert(handle, pid);
    }
}

/// Register `pid` from a worker thread unless the scheduler started aborting.
///
/// The flag is read under the same lock [`begin_abort`] raises it with, so a
/// child is either in the abort snapshot or refused here.
pub(crate) fn register_unless_aborting(
    live: &LivePids,
    aborting: &AtomicBool,
    handle: ExecHandle,
    pid: u32,
) -> bool {
    let mut live = match live.lock() {
        Ok(live) => live,
        Err(poisoned) => poisoned.into_inner(),
    };
    if aborting.load(Ordering::SeqCst) {
        return false;
    }
    live.insert(handle, pid);
    true
}

/// Raise `aborting` and snapshot the process groups that must be killed.
pub(crate) fn begin_abort(live: &LivePids, aborting: &AtomicBool) -> Vec<(ExecHandle, u32)> {
    let live = match live.lock() {
        Ok(live) => live,
        Err(poisoned) => poisoned.into_inner(),
    };
    aborting.store(true, Ordering::SeqCst);
    live.iter().map(|(h, p)| (*h, *p)).collect()
}

fn unregister(live: &LivePids, handle: ExecHandle) {
    if let Ok(mut live) = live.lock() {
        live.remove(&handle);
    }
}

/// Wait for a registered child and forget it once it is gone.
pub(crate) fn wait_registered(
    live: &LivePids,
    handle: ExecHandle,
    child: SpawnedChild,
    timeout: Duration,
) -> Result<Option<ProcessStatus>, RunnerError> {
    let status = child.wait_timeout(timeout);
    unregister(live, handle);
    status
}

/// Everything a worker thread needs to supervise one test case.
pub(crate) struct Job {
    pub(crate) handle: ExecHandle,
    pub(crate) program: Arc<TestProgram>,
    pub(crate) case_name: String,
    pub(crate) interface: Arc<dyn TestInterface>,
    pub(crate) vars: Vars,
    pub(crate) layout: Layout,
    pub(crate) cleanup_timeout: Duration,
}

impl Job {
    /// Run the cleanup step, if the case has one, appending to its output.
    pub(crate) fn run_cleanup(&self, live: &LivePids, aborting: &AtomicBool) -> CleanupOutcome {
        let Some(command) = self.interface.cleanup_command(
            &self.program,
            &self.case_name,
            &self.vars,
            &self.layout.control,
        ) else {
            return CleanupOutcome::NotNeeded;
        };
        if aborting.load(Ordering::SeqCst) {
            return CleanupOutcome::Skipped;
        }

        let outputs = OutputFiles::new(&self.layout.stdout, &self.layout.stderr).appending();
        let child = match spawn(&command.isolate(&self.layout.work), &outputs) {
            Ok(child) => child,
            Err(e) => return CleanupOutcome::Failed(e.to_string()),
        };
        if !register_unless_aborting(live, aborting, self.handle, child.pid()) {
            terminate_group(child.pid());
            if let Err(e) = child.wait_timeout(self.cleanup_timeout) {
                tracing::debug!(handle = %self.handle, error = %e, "cannot reap aborted cleanup step");
            }
            return CleanupOutcome::Skipped;
        }

        match wait_registered(live, self.handle, child, self.cleanup_timeout) {
            Ok(None) => {
                tracing::warn!(handle = %self.handle, case = %self.case_name, "cleanup step timed out");
                CleanupOutcome::TimedOut
            }
            Ok(Some(status)) if status.is_success() => CleanupOutcome::Succeeded,
            Ok(Some(status)) => {
                tracing::warn!(handle = %self.handle, case = %self.case_name, %status, "cleanup step failed");
                CleanupOutcome::Failed(status.to_string())
            }
            Err(e) => CleanupOutcome::Failed(e.to_string()),
        }
    }

    /// Supervise an already spawned body through its cleanup step.
    pub(crate) fn supervise(
        self,
        child: SpawnedChild,
        timeout: Duration,
        start: DateTime<Utc>,
        live: LivePids,
        aborting: Arc<AtomicBool>,
        completions: Sender<Completion>,
    ) {
        let outcome = match wait_registered(&live, self.handle, child, timeout) {
            Ok(status) => {
                tracing::debug!(
                    handle = %self.handle,
                    status = %status.map_or_else(|| "timed out".to_string(), |s| s.to_string()),
                    "test body finished"
                );
                let cleanup = self.run_cleanup(&live, &aborting);
                Outcome::Finished { status, cleanup }
            }
            Err(e) => Outcome::Precomputed(TestResult::broken(format!(
                "Cannot wait for test case: {e}"
            ))),
        };

        let completion = Completion {
            handle: self.handle,
            outcome,
            start,
            end: Utc::now(),
        };
        if completions.send(completion).is_err() {
            tracing::debug!(handle = %self.handle, "scheduler gone before completion was reported");
        }
    }
}

/// The final result of a body given its interface and cleanup outcome.
pub(crate) fn finish_result(
    interface: &dyn TestInterface,
    layout: &Layout,
    status: Option<ProcessStatus>,
    cleanup: &CleanupOutcome,
) -> TestResult {
    let result = interface.compute_result(status, &layout.control, &layout.stdout, &layout.stderr);
    if !result.good() {
        return result;
    }
    match cleanup {
        CleanupOutcome::TimedOut => TestResult::broken("Test case cleanup timed out"),
        CleanupOutcome::Failed(_) => {
            TestResult::broken("Test case cleanup did not terminate successfully")
        }
        CleanupOutcome::NotNeeded | CleanupOutcome::Skipped | CleanupOutcome::Succeeded => result,
    }
}

/// Command for the body of a case, isolated in its work directory.
pub(crate) fn body_command(
    interface: &dyn TestInterface,
    program: &TestProgram,
    case_name: &str,
    vars: &Vars,
    layout: &Layout,
) -> CommandSpec {
    interface
        .test_command(program, case_name, vars, &layout.control)
        .isolate(&layout.work)
}
