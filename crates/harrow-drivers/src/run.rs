//! The `test` driver: run every matching test case and record the results.

use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use harrow_config::Config;
use harrow_engine::{
    Filter, FilterSet, ScanResult, Scanner, Scheduler, TestResultHandle, check_interrupt,
    current_context, load_harrowfile,
};
use harrow_store::{STDERR_FILE, STDOUT_FILE, Store, WriteTransaction, new_results_file};
use harrow_utils::logging::driver_span;

use crate::error::DriverError;
use crate::suite_root;

/// Progress callbacks of [`run_tests`].
pub trait RunHooks {
    /// Called once, before anything runs, with the file results go to.
    fn got_results_file(&mut self, _path: &Path) {}

    /// Called for every completed test case, before its directory is released.
    fn got_test_case(&mut self, handle: &TestResultHandle);
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub results_file: PathBuf,
    pub unused_filters: BTreeSet<Filter>,
    pub good_count: usize,
    pub bad_count: usize,
}

impl RunResult {
    #[must_use]
    pub fn all_good(&self) -> bool {
        self.bad_count == 0
    }
}

struct Recorder<'a, 'tx> {
    tx: WriteTransaction<'tx>,
    hooks: &'a mut dyn RunHooks,
    good: usize,
    bad: usize,
}

impl Recorder<'_, '_> {
    fn persist(&mut self, handle: TestResultHandle) -> Result<(), DriverError> {
        let program = handle.test_program();
        let program_id = self.tx.put_test_program(program)?;
        let case = program.find(handle.test_case_name())?;
        let case_id = self.tx.put_test_case(program_id, case)?;
        self.tx.put_result(
            case_id,
            handle.test_result(),
            handle.start_time(),
            handle.end_time(),
        )?;
        self.tx
            .put_test_case_file(case_id, STDOUT_FILE, handle.stdout_file())?;
        self.tx
            .put_test_case_file(case_id, STDERR_FILE, handle.stderr_file())?;

        self.hooks.got_test_case(&handle);
        if handle.test_result().good() {
            self.good += 1;
        } else {
            self.bad += 1;
        }
        handle.cleanup()?;
        Ok(())
    }
}

fn start(scheduler: &mut Scheduler, next: ScanResult, config: &Config) -> Result<(), DriverError> {
    scheduler.spawn_test(next.program, &next.case_name, config)?;
    Ok(())
}

/// Keep up to `parallelism` cases in flight, then run exclusive ones alone.
fn drive(
    scheduler: &mut Scheduler,
    scanner: &mut Scanner,
    recorder: &mut Recorder<'_, '_>,
    config: &Config,
) -> Result<(), DriverError> {
    let parallelism = config.parallelism.max(1);
    let mut exclusive = VecDeque::new();

    loop {
        while scheduler.in_flight() < parallelism {
            check_interrupt()?;
            let Some(next) = scanner.yield_next() else {
                break;
            };
            if next.program.find(&next.case_name)?.metadata().is_exclusive {
                tracing::debug!(
                    program = %next.program.relative_path().display(),
                    case = %next.case_name,
                    "deferring exclusive test case"
                );
                exclusive.push_back(next);
                continue;
            }
            start(scheduler, next, config)?;
        }

        if scheduler.in_flight() == 0 {
            break;
        }
        let handle = scheduler.wait_any()?;
        recorder.persist(handle)?;
    }

    for next in exclusive {
        check_interrupt()?;
        start(scheduler, next, config)?;
        let handle = scheduler.wait_any()?;
        recorder.persist(handle)?;
    }
    Ok(())
}

fn run_in(
    scheduler: &mut Scheduler,
    harrowfile: &Path,
    build_root: Option<&Path>,
    store_file: Option<&Path>,
    filters: FilterSet,
    config: &Config,
    hooks: &mut dyn RunHooks,
) -> Result<RunResult, DriverError> {
    let programs = load_harrowfile(harrowfile, build_root, scheduler, config)?;
    let results_file = match store_file {
        Some(path) => path.to_path_buf(),
        None => new_results_file(&config.store_dir, &suite_root(harrowfile, build_root)?),
    };
    hooks.got_results_file(&results_file);

    let mut store = Store::create(&results_file)?;
    let mut recorder = Recorder {
        tx: store.begin_write()?,
        hooks,
        good: 0,
        bad: 0,
    };
    recorder.tx.put_context(&current_context()?)?;

    let mut scanner = Scanner::new(programs, filters);
    match drive(scheduler, &mut scanner, &mut recorder, config) {
        Ok(()) => {}
        Err(DriverError::Interrupted) => {
            tracing::warn!(
                recorded = recorder.good + recorder.bad,
                "interrupted; keeping the results recorded so far"
            );
            recorder.tx.commit()?;
            return Err(DriverError::Interrupted);
        }
        Err(e) => return Err(e),
    }

    let Recorder { tx, good, bad, .. } = recorder;
    tx.commit()?;
    Ok(RunResult {
        results_file,
        unused_filters: scanner.unused_filters(),
        good_count: good,
        bad_count: bad,
    })
}

/// Run the test cases of `harrowfile` selected by `filters`.
///
/// Results go to `store_file`, or to a new file in the configured store
/// directory. An interrupt keeps what was recorded so far, kills whatever
/// is still running and ends the run with [`DriverError::Interrupted`].
pub fn run_tests(
    harrowfile: &Path,
    build_root: Option<&Path>,
    store_file: Option<&Path>,
    filters: FilterSet,
    config: &Config,
    hooks: &mut dyn RunHooks,
) -> Result<RunResult, DriverError> {
    let span = driver_span("test", &harrowfile.display().to_string());
    let _guard = span.enter();

    let mut scheduler = Scheduler::setup(config)?;
    let outcome = run_in(
        &mut scheduler,
        harrowfile,
        build_root,
        store_file,
        filters,
        config,
        hooks,
    );
    let cleanup = scheduler.cleanup();

    match (outcome, cleanup) {
        (Ok(result), Ok(())) => {
            tracing::info!(good = result.good_count, bad = result.bad_count, "run finished");
            Ok(result)
        }
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), cleanup) => {
            if let Err(cleanup_err) = cleanup {
                tracing::warn!(error = %cleanup_err, "scheduler cleanup failed");
            }
            Err(e)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testing::Suite;
    use harrow_engine::interrupts;
    use harrow_model::TestResultType;
    use harrow_utils::test_support::{atf_program_body, write_script};
    use serial_test::serial;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Collect {
        results_file: Option<PathBuf>,
        results: HashMap<String, (TestResultType, String)>,
        interrupt_after: Option<usize>,
    }

    impl RunHooks for Collect {
        fn got_results_file(&mut self, path: &Path) {
            self.results_file = Some(path.to_path_buf());
        }

        fn got_test_case(&mut self, handle: &TestResultHandle) {
            assert!(handle.work_directory().exists());
            let key = format!(
                "{}:{}",
                handle.test_program().relative_path().display(),
                handle.test_case_name()
            );
            let result = handle.test_result();
            self.results
                .insert(key, (result.kind(), result.reason().to_string()));
            if self.interrupt_after == Some(self.results.len()) {
                interrupts::request_interrupt();
            }
        }
    }

    fn run(suite: &Suite, filters: &[&str], hooks: &mut Collect) -> Result<RunResult, DriverError> {
        let harrowfile = suite.dir.path().join(harrow_engine::HARROWFILE);
        run_tests(
            &harrowfile,
            None,
            None,
            FilterSet::parse(filters).unwrap(),
            &suite.config,
            hooks,
        )
    }

    #[test]
    #[serial(interrupts)]
    fn test_scenario_pass_fail_timeout() {
        let suite = Suite::new(2);
        write_script(suite.dir.path(), "pass", "exit 0");
        write_script(suite.dir.path(), "fail", "exit 8");
        let lock = suite.dir.path().join("held.lock");
        write_script(
            suite.dir.path(),
            "atf_hang",
            &atf_program_body(&[
                ("held", &["has.cleanup: true", "timeout: 1"], &format!("touch '{}'; sleep 60", lock.display())),
                ("held:cleanup", &[], &format!("rm -f '{}'", lock.display())),
            ]),
        );
        suite.harrowfile(
            r#"
test_suite = "scenario"

[[test_program]]
interface = "plain"
name = "pass"

[[test_program]]
interface = "plain"
name = "fail"

[[test_program]]
interface = "atf"
name = "atf_hang"
"#,
        );

        let mut hooks = Collect::default();
        let result = run(&suite, &[], &mut hooks).unwrap();

        assert_eq!(result.good_count, 1);
        assert_eq!(result.bad_count, 2);
        assert!(result.unused_filters.is_empty());
        assert_eq!(hooks.results["pass:main"].0, TestResultType::Passed);
        assert_eq!(
            hooks.results["fail:main"],
            (
                TestResultType::Failed,
                "Returned non-success exit status 8".to_string()
            )
        );
        assert_eq!(
            hooks.results["atf_hang:held"],
            (TestResultType::Broken, "Test case body timed out".to_string())
        );
        assert!(!lock.exists(), "cleanup should remove the held lock");

        let stored = Store::open(&result.results_file).unwrap().results().unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(hooks.results_file.as_ref(), Some(&result.results_file));
        assert!(result.results_file.starts_with(&suite.config.store_dir));
    }

    #[test]
    #[serial(interrupts)]
    fn test_parallelism_bound_and_exclusive_cases() {
        let suite = Suite::new(2);
        let log = suite.dir.path().join("events.log");
        let body = |name: &str| {
            format!(
                "echo \"start {name}\" >> '{log}'; sleep 0.3; echo \"end {name}\" >> '{log}'",
                log = log.display()
            )
        };
        let mut harrowfile = String::from("test_suite = \"s\"\n");
        for name in ["a", "b", "c", "d"] {
            write_script(suite.dir.path(), name, &body(name));
            harrowfile.push_str(&format!(
                "[[test_program]]\ninterface = \"plain\"\nname = \"{name}\"\n"
            ));
        }
        for name in ["x1", "x2"] {
            write_script(suite.dir.path(), name, &body(name));
            harrowfile.push_str(&format!(
                "[[test_program]]\ninterface = \"plain\"\nname = \"{name}\"\nis_exclusive = true\n"
            ));
        }
        // Exclusivity declared per case by the listing, not by the Harrowfile.
        let atf_body = |name: &str| format!("{}; echo passed > \"$resfile\"", body(name));
        write_script(
            suite.dir.path(),
            "mixed",
            &atf_program_body(&[
                ("m_shared", &[], &atf_body("m_shared")),
                ("x_solo", &["is.exclusive: true"], &atf_body("x_solo")),
            ]),
        );
        harrowfile.push_str("[[test_program]]\ninterface = \"atf\"\nname = \"mixed\"\n");
        suite.harrowfile(&harrowfile);

        let mut hooks = Collect::default();
        let result = run(&suite, &[], &mut hooks).unwrap();
        assert_eq!(result.good_count, 8, "{:?}", hooks.results);
        assert_eq!(hooks.results["mixed:x_solo"].0, TestResultType::Passed);

        let events = std::fs::read_to_string(&log).unwrap();
        let mut running: Vec<String> = Vec::new();
        let mut max = 0;
        let mut starts = Vec::new();
        for line in events.lines() {
            let (event, name) = line.split_once(' ').unwrap();
            if event == "start" {
                running.push(name.to_string());
                starts.push(name.to_string());
                if name.starts_with('x') {
                    assert_eq!(running.len(), 1, "exclusive {name} overlapped {running:?}");
                }
                for other in &running {
                    if other.starts_with('x') {
                        assert_eq!(running.len(), 1, "{name} overlapped exclusive {other}");
                    }
                }
                max = max.max(running.len());
            } else {
                running.retain(|r| r != name);
            }
        }
        assert!(max <= 2, "saw {max} cases in flight");
        assert!(starts[..5].contains(&"m_shared".to_string()), "{starts:?}");
        assert_eq!(&starts[5..], ["x1", "x2", "x_solo"]);
    }

    #[test]
    #[serial(interrupts)]
    fn test_unused_filters_are_reported() {
        let suite = Suite::new(1);
        write_script(suite.dir.path(), "dir/prog", "exit 0");
        suite.harrowfile(
            "test_suite = \"s\"\n[[test_program]]\ninterface = \"plain\"\nname = \"dir/prog\"\n",
        );

        let result = run(&suite, &["dir/prog:main", "nothing/here"], &mut Collect::default())
            .unwrap();
        assert_eq!(result.good_count, 1);
        let unused: Vec<String> = result.unused_filters.iter().map(ToString::to_string).collect();
        assert_eq!(unused, ["nothing/here"]);
    }

    #[test]
    #[serial(interrupts)]
    fn test_case_filters_on_one_program() {
        let suite = Suite::new(1);
        write_script(suite.dir.path(), "prog", "exit 0");
        suite.harrowfile(
            "test_suite = \"s\"\n[[test_program]]\ninterface = \"plain\"\nname = \"prog\"\n",
        );

        let mut hooks = Collect::default();
        let result = run(&suite, &["prog:main", "prog:nothing"], &mut hooks).unwrap();
        assert_eq!(result.good_count, 1);
        assert!(hooks.results.contains_key("prog:main"));
        let unused: Vec<String> = result.unused_filters.iter().map(ToString::to_string).collect();
        assert_eq!(unused, ["prog:nothing"]);
    }

    #[test]
    #[serial(interrupts)]
    fn test_interrupt_commits_what_was_recorded() {
        let suite = Suite::new(1);
        let mut harrowfile = String::from("test_suite = \"s\"\n");
        for name in ["a", "b", "c"] {
            write_script(suite.dir.path(), name, "exit 0");
            harrowfile.push_str(&format!(
                "[[test_program]]\ninterface = \"plain\"\nname = \"{name}\"\n"
            ));
        }
        suite.harrowfile(&harrowfile);

        let mut hooks = Collect {
            interrupt_after: Some(1),
            ..Collect::default()
        };
        let err = run(&suite, &[], &mut hooks).unwrap_err();
        interrupts::reset();

        assert!(matches!(err, DriverError::Interrupted));
        let results_file = hooks.results_file.unwrap();
        let store = Store::open(&results_file).unwrap();
        assert_eq!(store.results().unwrap().len(), 1);
        assert!(store.context().unwrap().cwd.is_absolute());
    }

    #[test]
    #[serial(interrupts)]
    fn test_listing_failure_is_recorded_as_broken() {
        let suite = Suite::new(1);
        write_script(suite.dir.path(), "crashy", "kill -SEGV $$");
        suite.harrowfile(
            "test_suite = \"s\"\n[[test_program]]\ninterface = \"atf\"\nname = \"crashy\"\n",
        );

        let mut hooks = Collect::default();
        let result = run(&suite, &[], &mut hooks).unwrap();
        assert_eq!(result.bad_count, 1);
        let (kind, reason) = &hooks.results["crashy:__test_cases_list__"];
        assert_eq!(*kind, TestResultType::Broken);
        assert!(reason.contains("received signal"), "{reason}");
    }
}
