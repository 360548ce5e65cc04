//! Process execution core.
//!
//! A [`Scheduler`] owns a private work root. Every spawned test case gets a
//! control directory `<root>/<token>/` holding its `work/` directory and the
//! captured `stdout.txt`/`stderr.txt`. A worker thread per case supervises
//! the body and its cleanup step and reports over a channel; the coordinator
//! collects completions with [`Scheduler::wait_any`].

mod handles;
mod listing;
mod worker;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;
use harrow_config::Config;
use harrow_model::{Context, TestCaseLister, TestCasesMap, TestProgram, TestResult};
use harrow_runner::{ExitHandle, OutputFiles, spawn, terminate_group};
use tempfile::TempDir;

pub use handles::{ExecHandle, ResultHandle, TestResultHandle};

use crate::error::EngineError;
use crate::interface::{InterfaceRegistry, TestInterface};
use crate::interrupts;
use crate::requirements::check_requirements;
use listing::{SchedulerLister, Shared};
use worker::{
    CleanupOutcome, Completion, Job, Layout, LivePids, Outcome, begin_abort, body_command,
    finish_result, register, wait_registered,
};

/// How often a blocked [`Scheduler::wait_any`] looks at the interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

struct InFlight {
    program: Arc<TestProgram>,
    case_name: String,
    interface: Arc<dyn TestInterface>,
    layout: Layout,
    worker: Option<JoinHandle<()>>,
}

pub struct Scheduler {
    root: Option<TempDir>,
    shared: Arc<Shared>,
    in_flight: HashMap<ExecHandle, InFlight>,
    live: LivePids,
    aborting: Arc<AtomicBool>,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
}

impl Scheduler {
    /// Create a scheduler with the built-in interfaces registered.
    ///
    /// Clears any earlier interrupt and installs the signal handler.
    pub fn setup(config: &Config) -> Result<Self, EngineError> {
        Self::with_registry(config, InterfaceRegistry::with_builtins())
    }

    pub fn with_registry(config: &Config, registry: InterfaceRegistry) -> Result<Self, EngineError> {
        interrupts::setup()?;

        harrow_utils::paths::ensure_dir_all(&config.work_root).map_err(|source| {
            EngineError::WorkDirectory {
                path: config.work_root.clone(),
                source,
            }
        })?;
        let root = tempfile::Builder::new()
            .prefix("harrow.")
            .tempdir_in(&config.work_root)
            .map_err(|source| EngineError::WorkDirectory {
                path: config.work_root.clone(),
                source,
            })?;
        tracing::debug!(root = %root.path().display(), "scheduler work root created");

        let (completions_tx, completions_rx) = mpsc::channel();
        Ok(Self {
            shared: Arc::new(Shared::new(root.path().to_path_buf(), registry)),
            root: Some(root),
            in_flight: HashMap::new(),
            live: Arc::new(Mutex::new(HashMap::new())),
            aborting: Arc::new(AtomicBool::new(false)),
            completions_tx,
            completions_rx,
        })
    }

    #[must_use]
    pub fn root_work_directory(&self) -> &Path {
        &self.shared.root
    }

    #[must_use]
    pub fn registered_interface_names(&self) -> Vec<String> {
        match self.shared.registry.read() {
            Ok(registry) => registry.names(),
            Err(poisoned) => poisoned.into_inner().names(),
        }
    }

    pub fn register_interface(
        &mut self,
        name: impl Into<String>,
        interface: Arc<dyn TestInterface>,
    ) -> Result<(), EngineError> {
        match self.shared.registry.write() {
            Ok(mut registry) => registry.register(name, interface),
            Err(poisoned) => poisoned.into_inner().register(name, interface),
        }
    }

    pub fn ensure_valid_interface(&self, name: &str) -> Result<(), EngineError> {
        self.shared.interface(name).map(|_| ())
    }

    /// Number of spawned cases whose completion has not been collected.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// List the test cases of `program` synchronously.
    pub fn list_tests(
        &self,
        program: &TestProgram,
        config: &Config,
    ) -> Result<TestCasesMap, EngineError> {
        self.shared.list_tests(program, config)
    }

    /// A lister for lazy programs that lists through this scheduler.
    #[must_use]
    pub fn lister(&self, config: &Config) -> Arc<dyn TestCaseLister> {
        Arc::new(SchedulerLister {
            shared: Arc::clone(&self.shared),
            config: config.clone(),
        })
    }

    fn allocate(&self) -> Result<(ExecHandle, Layout), EngineError> {
        let handle = ExecHandle(self.shared.next_token());
        let layout = Layout::new(self.shared.root.join(handle.0.to_string()));
        harrow_utils::paths::ensure_dir_all(&layout.work).map_err(|source| {
            EngineError::WorkDirectory {
                path: layout.work.clone(),
                source,
            }
        })?;
        Ok((handle, layout))
    }

    /// Result a case gets without running, if any.
    fn result_without_running(
        program: &TestProgram,
        case_name: &str,
        config: &Config,
        layout: &Layout,
    ) -> Result<Option<TestResult>, EngineError> {
        let case = program.find(case_name)?;
        if let Some(fake) = case.fake_result() {
            return Ok(Some(fake.clone()));
        }
        Ok(check_requirements(
            case.metadata(),
            config,
            program.test_suite_name(),
            &layout.work,
        )
        .map(TestResult::skipped))
    }

    /// Start `case_name` of `program` and return without waiting for it.
    pub fn spawn_test(
        &mut self,
        program: Arc<TestProgram>,
        case_name: &str,
        config: &Config,
    ) -> Result<ExecHandle, EngineError> {
        let interface = self.shared.interface(program.interface_name())?;
        let (handle, layout) = self.allocate()?;
        let start = Utc::now();

        let mut in_flight = InFlight {
            program: Arc::clone(&program),
            case_name: case_name.to_string(),
            interface: Arc::clone(&interface),
            layout: layout.clone(),
            worker: None,
        };

        let precomputed = match Self::result_without_running(&program, case_name, config, &layout)
        {
            Ok(result) => result,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&layout.control);
                return Err(e);
            }
        };
        if let Some(result) = precomputed {
            tracing::debug!(%handle, case = case_name, %result, "completed without running");
            self.in_flight.insert(handle, in_flight);
            self.complete_now(handle, Outcome::Precomputed(result), start);
            return Ok(handle);
        }

        let timeout = program.find(case_name)?.metadata().timeout;
        let vars = config.test_suite_vars(program.test_suite_name());
        let command = body_command(interface.as_ref(), &program, case_name, &vars, &layout);
        let outputs = OutputFiles::new(&layout.stdout, &layout.stderr);
        let child = match spawn(&command, &outputs) {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(%handle, case = case_name, error = %e, "cannot spawn test case");
                self.in_flight.insert(handle, in_flight);
                self.complete_now(
                    handle,
                    Outcome::Precomputed(TestResult::broken(format!(
                        "Failed to execute test program: {e}"
                    ))),
                    start,
                );
                return Ok(handle);
            }
        };
        register(&self.live, handle, child.pid());
        tracing::info!(
            %handle,
            pid = child.pid(),
            program = %program.relative_path().display(),
            case = case_name,
            "spawned test case"
        );

        let job = Job {
            handle,
            program,
            case_name: case_name.to_string(),
            interface,
            vars,
            layout,
            cleanup_timeout: config.cleanup_timeout,
        };
        let live = Arc::clone(&self.live);
        let aborting = Arc::clone(&self.aborting);
        let completions = self.completions_tx.clone();
        in_flight.worker = Some(std::thread::spawn(move || {
            job.supervise(child, timeout, start, live, aborting, completions);
        }));
        self.in_flight.insert(handle, in_flight);
        Ok(handle)
    }

    fn complete_now(&self, handle: ExecHandle, outcome: Outcome, start: chrono::DateTime<Utc>) {
        let completion = Completion {
            handle,
            outcome,
            start,
            end: Utc::now(),
        };
        // The receiver lives in `self`, so this cannot fail.
        let _ = self.completions_tx.send(completion);
    }

    /// Block until any in-flight case completes and return its result.
    ///
    /// Fails with [`EngineError::Interrupted`] when a termination request
    /// arrives while waiting; the case stays in flight until
    /// [`cleanup`](Self::cleanup).
    pub fn wait_any(&mut self) -> Result<TestResultHandle, EngineError> {
        if self.in_flight.is_empty() {
            return Err(EngineError::NothingInFlight);
        }

        let (completion, mut entry) = loop {
            interrupts::check_interrupt()?;
            let completion = match self.completions_rx.recv_timeout(INTERRUPT_POLL) {
                Ok(completion) => completion,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(EngineError::NothingInFlight),
            };
            match self.in_flight.remove(&completion.handle) {
                Some(entry) => break (completion, entry),
                None => {
                    tracing::warn!(handle = %completion.handle, "completion for unknown handle");
                }
            }
        };
        if let Some(worker) = entry.worker.take() {
            let _ = worker.join();
        }

        let result = match &completion.outcome {
            Outcome::Precomputed(result) => result.clone(),
            Outcome::Finished { status, cleanup } => {
                finish_result(entry.interface.as_ref(), &entry.layout, *status, cleanup)
            }
        };
        let elapsed = harrow_runner::elapsed_between(completion.start, completion.end);
        tracing::info!(
            handle = %completion.handle,
            case = %entry.case_name,
            %result,
            elapsed = %harrow_utils::logging::format_duration(elapsed),
            "test case completed"
        );

        let base = ResultHandle::new(
            completion.handle,
            completion.start,
            completion.end,
            entry.layout.control.clone(),
            entry.layout.stdout.clone(),
            entry.layout.stderr.clone(),
        );
        Ok(TestResultHandle::new(
            base,
            entry.program,
            entry.case_name,
            result,
        ))
    }

    /// Run one case synchronously with its output sent to the given files.
    ///
    /// A debugger attached to the case sees the command before it runs and
    /// the exit handle after the body finished, before the cleanup step.
    pub fn debug_test(
        &mut self,
        program: Arc<TestProgram>,
        case_name: &str,
        config: &Config,
        stdout_path: &Path,
        stderr_path: &Path,
    ) -> Result<TestResultHandle, EngineError> {
        let interface = self.shared.interface(program.interface_name())?;
        let (handle, mut layout) = self.allocate()?;
        layout.stdout = stdout_path.to_path_buf();
        layout.stderr = stderr_path.to_path_buf();
        let start = Utc::now();

        let result = match Self::result_without_running(&program, case_name, config, &layout)? {
            Some(result) => result,
            None => {
                let case = program.find(case_name)?;
                let debugger = case.debugger();
                let vars = config.test_suite_vars(program.test_suite_name());
                let command = body_command(interface.as_ref(), &program, case_name, &vars, &layout);
                if let Some(debugger) = &debugger {
                    debugger.before_calling(&program, case_name, &command);
                }

                let outputs = OutputFiles::new(&layout.stdout, &layout.stderr);
                let child = spawn(&command, &outputs)?;
                register(&self.live, handle, child.pid());
                tracing::info!(%handle, case = case_name, "debugging test case");
                let status = wait_registered(&self.live, handle, child, case.metadata().timeout)?;

                if let Some(debugger) = &debugger {
                    let exit = ExitHandle {
                        status,
                        work_directory: layout.work.clone(),
                        stdout_file: layout.stdout.clone(),
                        stderr_file: layout.stderr.clone(),
                        start_time: start,
                        end_time: Utc::now(),
                    };
                    debugger.after_execution(&program, case_name, &exit);
                }

                let job = Job {
                    handle,
                    program: Arc::clone(&program),
                    case_name: case_name.to_string(),
                    interface: Arc::clone(&interface),
                    vars,
                    layout: layout.clone(),
                    cleanup_timeout: config.cleanup_timeout,
                };
                let cleanup = job.run_cleanup(&self.live, &self.aborting);
                if cleanup != CleanupOutcome::NotNeeded {
                    tracing::debug!(%handle, ?cleanup, "debug cleanup finished");
                }
                finish_result(interface.as_ref(), &layout, status, &cleanup)
            }
        };

        let base = ResultHandle::new(
            handle,
            start,
            Utc::now(),
            layout.control,
            layout.stdout,
            layout.stderr,
        );
        Ok(TestResultHandle::new(
            base,
            program,
            case_name.to_string(),
            result,
        ))
    }

    fn shutdown(&mut self) {
        for (handle, pid) in begin_abort(&self.live, &self.aborting) {
            tracing::info!(%handle, pid, "killing in-flight test case");
            terminate_group(pid);
        }

        for (_, mut entry) in self.in_flight.drain() {
            if let Some(worker) = entry.worker.take() {
                let _ = worker.join();
            }
        }
        while self.completions_rx.try_recv().is_ok() {}
    }

    /// Kill and reap every in-flight case, then remove the work root.
    pub fn cleanup(mut self) -> Result<(), EngineError> {
        self.shutdown();
        match self.root.take() {
            Some(root) => {
                let path = root.path().to_path_buf();
                root.close()
                    .map_err(|source| EngineError::Cleanup { path, source })
            }
            None => Ok(()),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.root.is_some() {
            tracing::debug!("scheduler dropped without cleanup; shutting down");
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("root", &self.shared.root)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

/// Snapshot of the working directory and environment for run records.
pub fn current_context() -> Result<Context, EngineError> {
    Context::current().map_err(EngineError::Context)
}
