//! Test command implementation
//!
//! Handles `harrow test`: runs the matching cases and records them.

use std::path::Path;

use anyhow::Result;
use harrow_config::Config;
use harrow_drivers::run_tests;
use harrow_utils::exit_codes::ExitCode;

use super::common::{outcome_code, parse_filters};
use crate::cli::args::SuiteArgs;
use crate::console::TestConsole;
use crate::error::HarrowError;

/// Execute the test command
pub fn execute_test_command(
    config: &Config,
    suite: &SuiteArgs,
    results_file: Option<&Path>,
    filters: &[String],
) -> Result<ExitCode> {
    let filters = parse_filters(filters)?;
    let mut console = TestConsole::new(std::io::stdout().lock());
    let run = run_tests(
        &suite.harrowfile,
        suite.build_root.as_deref(),
        results_file,
        filters,
        config,
        &mut console,
    )
    .map_err(HarrowError::from)?;
    console.finish(&run);
    Ok(outcome_code(run.bad_count, &run.unused_filters))
}
