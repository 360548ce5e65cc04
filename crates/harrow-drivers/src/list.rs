//! The `list` driver.

use std::collections::BTreeSet;
use std::path::Path;

use harrow_config::Config;
use harrow_engine::{Filter, FilterSet, Scanner, Scheduler, check_interrupt, load_harrowfile};
use harrow_model::TestProgram;
use harrow_utils::logging::driver_span;

use crate::error::DriverError;

pub trait ListHooks {
    fn got_test_case(&mut self, program: &TestProgram, case_name: &str);
}

/// Enumerate the test cases selected by `filters` without running them.
///
/// Returns the filters that matched nothing.
pub fn list_tests(
    harrowfile: &Path,
    build_root: Option<&Path>,
    filters: FilterSet,
    config: &Config,
    hooks: &mut dyn ListHooks,
) -> Result<BTreeSet<Filter>, DriverError> {
    let span = driver_span("list", &harrowfile.display().to_string());
    let _guard = span.enter();

    let scheduler = Scheduler::setup(config)?;
    let outcome = (|| -> Result<_, DriverError> {
        let programs = load_harrowfile(harrowfile, build_root, &scheduler, config)?;
        let mut scanner = Scanner::new(programs, filters);
        loop {
            check_interrupt()?;
            let Some(next) = scanner.yield_next() else {
                break;
            };
            hooks.got_test_case(&next.program, &next.case_name);
        }
        Ok(scanner.unused_filters())
    })();
    let cleanup = scheduler.cleanup();
    let value = outcome?;
    cleanup?;
    Ok(value)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testing::Suite;
    use harrow_utils::test_support::{atf_program_body, write_script};
    use serial_test::serial;

    #[derive(Default)]
    struct Names(Vec<String>);

    impl ListHooks for Names {
        fn got_test_case(&mut self, program: &TestProgram, case_name: &str) {
            self.0
                .push(format!("{}:{case_name}", program.relative_path().display()));
        }
    }

    #[test]
    #[serial(interrupts)]
    fn test_lists_matching_cases_in_order() {
        let suite = Suite::new(1);
        write_script(
            suite.dir.path(),
            "atf/prog",
            &atf_program_body(&[("one", &[], "exit 0"), ("two", &[], "exit 0")]),
        );
        write_script(suite.dir.path(), "plain_prog", "exit 0");
        let harrowfile = suite.harrowfile(
            r#"
test_suite = "s"

[[test_program]]
interface = "atf"
name = "atf/prog"

[[test_program]]
interface = "plain"
name = "plain_prog"
"#,
        );

        let mut names = Names::default();
        let unused = list_tests(
            &harrowfile,
            None,
            FilterSet::default(),
            &suite.config,
            &mut names,
        )
        .unwrap();
        assert!(unused.is_empty());
        assert_eq!(names.0, ["atf/prog:one", "atf/prog:two", "plain_prog:main"]);

        let mut names = Names::default();
        let unused = list_tests(
            &harrowfile,
            None,
            FilterSet::parse(["atf/prog:t*", "missing"]).unwrap(),
            &suite.config,
            &mut names,
        )
        .unwrap();
        assert_eq!(names.0, ["atf/prog:two"]);
        assert_eq!(
            unused.into_iter().map(|f| f.to_string()).collect::<Vec<_>>(),
            ["missing"]
        );
    }
}
