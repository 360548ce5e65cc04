//! Console rendering of driver progress.
//!
//! Each hooks implementation writes to any [`Write`]; the CLI hands them
//! stdout, tests hand them a `Vec<u8>`.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use harrow_drivers::{ListHooks, RunHooks, RunResult, ScanHooks};
use harrow_engine::{Filter, TestResultHandle};
use harrow_model::{Context, Debugger, Metadata, TestProgram, TestResult, TestResultType};
use harrow_runner::ExitHandle;
use harrow_store::ResultRecord;
use harrow_utils::logging::format_duration;

fn case_id(program: &TestProgram, case_name: &str) -> String {
    format!("{}:{case_name}", program.relative_path().display())
}

fn result_line(id: &str, result: &TestResult, elapsed: Duration) -> String {
    format!("{id}  ->  {result}  [{}]", format_duration(elapsed))
}

/// Heading used for a result type in reports.
fn type_heading(kind: TestResultType) -> &'static str {
    match kind {
        TestResultType::Broken => "Broken tests",
        TestResultType::ExpectedFailure => "Expected failures",
        TestResultType::Failed => "Failed tests",
        TestResultType::Passed => "Passed tests",
        TestResultType::Skipped => "Skipped tests",
    }
}

/// Prints one line per completed case of `harrow test`.
pub struct TestConsole<W: Write> {
    out: W,
    results_file: Option<PathBuf>,
}

impl<W: Write> TestConsole<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            results_file: None,
        }
    }

    /// Print the closing summary of a run.
    pub fn finish(&mut self, run: &RunResult) {
        let total = run.good_count + run.bad_count;
        let _ = writeln!(self.out);
        if let Some(path) = &self.results_file {
            let _ = writeln!(self.out, "Results file: {}", path.display());
        }
        let _ = writeln!(
            self.out,
            "{}/{total} passed ({} failed)",
            run.good_count, run.bad_count
        );
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RunHooks for TestConsole<W> {
    fn got_results_file(&mut self, path: &Path) {
        self.results_file = Some(path.to_path_buf());
    }

    fn got_test_case(&mut self, handle: &TestResultHandle) {
        let id = case_id(handle.test_program(), handle.test_case_name());
        let _ = writeln!(
            self.out,
            "{}",
            result_line(&id, handle.test_result(), handle.elapsed())
        );
    }
}

/// Prints the cases `harrow list` finds, optionally with their metadata.
pub struct ListConsole<W: Write> {
    out: W,
    verbose: bool,
    defaults: BTreeMap<String, String>,
}

impl<W: Write> ListConsole<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            defaults: Metadata::default().to_properties(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ListHooks for ListConsole<W> {
    fn got_test_case(&mut self, program: &TestProgram, case_name: &str) {
        let _ = writeln!(self.out, "{}", case_id(program, case_name));
        if !self.verbose {
            return;
        }

        let _ = writeln!(self.out, "    interface = {}", program.interface_name());
        let _ = writeln!(self.out, "    test_suite = {}", program.test_suite_name());
        let Ok(case) = program.find(case_name) else {
            return;
        };
        for (name, value) in case.metadata().to_properties() {
            if self.defaults.get(&name) != Some(&value) {
                let _ = writeln!(self.out, "    {name} = {value}");
            }
        }
    }
}

/// Groups stored results by type and prints them at the end.
pub struct ReportConsole<W: Write> {
    out: W,
    results_file: PathBuf,
    shown: BTreeSet<TestResultType>,
    by_type: BTreeMap<TestResultType, Vec<String>>,
    counts: BTreeMap<TestResultType, usize>,
    total_time: Duration,
}

impl<W: Write> ReportConsole<W> {
    /// `shown` selects which result types get listed; all are counted.
    pub fn new(out: W, results_file: &Path, shown: BTreeSet<TestResultType>) -> Self {
        Self {
            out,
            results_file: results_file.to_path_buf(),
            shown,
            by_type: BTreeMap::new(),
            counts: BTreeMap::new(),
            total_time: Duration::ZERO,
        }
    }

    /// Number of reported results that were not good.
    #[must_use]
    pub fn bad_count(&self) -> usize {
        self.counts
            .iter()
            .filter(|(kind, _)| !kind.is_good())
            .map(|(_, count)| count)
            .sum()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ScanHooks for ReportConsole<W> {
    fn got_context(&mut self, context: &Context) {
        let _ = writeln!(self.out, "===> Execution context");
        let _ = writeln!(self.out, "Current directory: {}", context.cwd.display());
    }

    fn got_result(&mut self, record: &ResultRecord) {
        let kind = record.result.kind();
        *self.counts.entry(kind).or_default() += 1;
        self.total_time += record.elapsed();
        if self.shown.contains(&kind) {
            let id = case_id(&record.program, &record.case_name);
            self.by_type
                .entry(kind)
                .or_default()
                .push(result_line(&id, &record.result, record.elapsed()));
        }
    }

    fn end(&mut self, _unused_filters: &BTreeSet<Filter>) {
        for (kind, lines) in &self.by_type {
            let _ = writeln!(self.out, "===> {}", type_heading(*kind));
            for line in lines {
                let _ = writeln!(self.out, "{line}");
            }
        }

        let count = |kind| self.counts.get(&kind).copied().unwrap_or(0);
        let total: usize = self.counts.values().sum();
        let _ = writeln!(self.out, "===> Summary");
        let _ = writeln!(self.out, "Results read from {}", self.results_file.display());
        let _ = writeln!(
            self.out,
            "Test cases: {total} total, {} skipped, {} expected failures, {} broken, {} failed",
            count(TestResultType::Skipped),
            count(TestResultType::ExpectedFailure),
            count(TestResultType::Broken),
            count(TestResultType::Failed),
        );
        let _ = writeln!(self.out, "Total time: {}", format_duration(self.total_time));
    }
}

/// Tells the user where to look once the debugged body has finished.
#[derive(Debug, Default)]
pub struct ConsoleDebugger;

impl Debugger for ConsoleDebugger {
    fn after_execution(&self, program: &TestProgram, case_name: &str, exit: &ExitHandle) {
        let status = exit
            .status
            .map_or_else(|| "timed out".to_string(), |s| s.to_string());
        eprintln!("{} body {status}", case_id(program, case_name));
        eprintln!("  work directory: {}", exit.work_directory.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use harrow_model::{MetadataBuilder, TestCase, TestCasesMap};
    use std::sync::Arc;

    fn program() -> TestProgram {
        let mut builder = MetadataBuilder::new();
        builder.set("timeout", "10").unwrap();
        builder.set("custom.owner", "fs").unwrap();
        let metadata = builder.build();
        let cases = TestCasesMap::from([(
            "main".to_string(),
            TestCase::new("main", metadata.clone()),
        )]);
        TestProgram::new("plain", "dir/prog", "/suite", "s", metadata, cases)
    }

    fn record(result: TestResult, millis: i64) -> ResultRecord {
        let start = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        ResultRecord {
            program: Arc::new(program()),
            case_name: "main".to_string(),
            result,
            start_time: start,
            end_time: start + chrono::TimeDelta::milliseconds(millis),
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    #[test]
    fn test_list_console_verbose_shows_non_defaults() {
        let mut console = ListConsole::new(Vec::new(), true);
        console.got_test_case(&program(), "main");
        let out = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(
            out,
            "dir/prog:main\n    interface = plain\n    test_suite = s\n    custom.owner = fs\n    timeout = 10\n"
        );

        let mut console = ListConsole::new(Vec::new(), false);
        console.got_test_case(&program(), "main");
        assert_eq!(String::from_utf8(console.into_inner()).unwrap(), "dir/prog:main\n");
    }

    #[test]
    fn test_report_console_groups_and_counts() {
        let shown = BTreeSet::from([TestResultType::Failed, TestResultType::Broken]);
        let mut console = ReportConsole::new(Vec::new(), Path::new("/store/r.db"), shown);
        console.got_context(&Context::new(PathBuf::from("/here"), BTreeMap::new()));
        console.got_result(&record(TestResult::passed(), 500));
        console.got_result(&record(TestResult::failed("Returned non-success exit status 8"), 250));
        console.end(&BTreeSet::new());
        assert_eq!(console.bad_count(), 1);

        let out = String::from_utf8(console.into_inner()).unwrap();
        assert!(out.starts_with("===> Execution context\nCurrent directory: /here\n"));
        assert!(out.contains(
            "===> Failed tests\ndir/prog:main  ->  failed: Returned non-success exit status 8  [0.250s]\n"
        ));
        assert!(!out.contains("Passed tests"));
        assert!(out.contains("Test cases: 2 total, 0 skipped, 0 expected failures, 0 broken, 1 failed"));
        assert!(out.ends_with("Total time: 0.750s\n"));
    }

    #[test]
    fn test_test_console_summary() {
        let mut console = TestConsole::new(Vec::new());
        console.got_results_file(Path::new("/store/results.db"));
        console.finish(&RunResult {
            good_count: 2,
            bad_count: 1,
            ..RunResult::default()
        });
        let out = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(out, "\nResults file: /store/results.db\n2/3 passed (1 failed)\n");
    }
}
