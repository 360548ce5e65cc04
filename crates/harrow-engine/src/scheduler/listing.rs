use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use harrow_config::Config;
use harrow_model::{ModelError, TestCaseLister, TestCasesMap, TestProgram};
use harrow_runner::{OutputFiles, ProcessStatus, run_with_timeout};

use crate::error::EngineError;
use crate::interface::{InterfaceRegistry, TestInterface};

/// State shared by the scheduler and the listers it hands out.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) root: PathBuf,
    pub(crate) registry: RwLock<InterfaceRegistry>,
    next_token: AtomicU64,
}

impl Shared {
    pub(crate) fn new(root: PathBuf, registry: InterfaceRegistry) -> Self {
        Self {
            root,
            registry: RwLock::new(registry),
            next_token: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn interface(&self, name: &str) -> Result<Arc<dyn TestInterface>, EngineError> {
        match self.registry.read() {
            Ok(registry) => registry.get(name),
            Err(poisoned) => poisoned.into_inner().get(name),
        }
    }

    /// Run the list step of `program` in a scratch directory and resolve its
    /// cases against the program defaults.
    pub(crate) fn list_tests(
        &self,
        program: &TestProgram,
        config: &Config,
    ) -> Result<TestCasesMap, EngineError> {
        let interface = self.interface(program.interface_name())?;
        let vars = config.test_suite_vars(program.test_suite_name());

        let specs = match interface.list_command(program, &vars) {
            None => {
                let none = Path::new("/dev/null");
                interface.parse_list(Some(ProcessStatus::success()), none, none)?
            }
            Some(command) => {
                let scratch = self.root.join(format!("list-{}", self.next_token()));
                let work = scratch.join("work");
                harrow_utils::paths::ensure_dir_all(&work).map_err(|source| {
                    EngineError::WorkDirectory {
                        path: work.clone(),
                        source,
                    }
                })?;
                let outputs =
                    OutputFiles::new(scratch.join("stdout.txt"), scratch.join("stderr.txt"));

                tracing::debug!(program = %program.relative_path().display(), "listing test cases");
                let status = run_with_timeout(&command.isolate(&work), &outputs, config.list_timeout);
                let specs = status
                    .map_err(EngineError::from)
                    .and_then(|status| {
                        if status.is_none() {
                            tracing::warn!(
                                program = %program.relative_path().display(),
                                timeout = ?config.list_timeout,
                                "listing timed out"
                            );
                        }
                        interface
                            .parse_list(status, &outputs.stdout, &outputs.stderr)
                            .map_err(EngineError::from)
                    });

                if let Err(e) = std::fs::remove_dir_all(&scratch) {
                    tracing::warn!(dir = %scratch.display(), error = %e, "cannot remove listing directory");
                }
                specs?
            }
        };

        Ok(program.resolve_cases(specs)?)
    }
}

/// [`TestCaseLister`] backed by a scheduler, handed to lazy programs.
pub(crate) struct SchedulerLister {
    pub(crate) shared: Arc<Shared>,
    pub(crate) config: Config,
}

impl TestCaseLister for SchedulerLister {
    fn list_test_cases(&self, program: &TestProgram) -> Result<TestCasesMap, ModelError> {
        self.shared
            .list_tests(program, &self.config)
            .map_err(|e| ModelError::ListingFailed(e.to_string()))
    }
}
