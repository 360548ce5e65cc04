//! Debug command implementation
//!
//! Runs exactly one test case with its output redirected to the given paths,
//! which default to the terminal.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use harrow_config::Config;
use harrow_drivers::debug_test;
use harrow_engine::Filter;
use harrow_utils::exit_codes::ExitCode;

use crate::cli::args::SuiteArgs;
use crate::console::ConsoleDebugger;
use crate::error::HarrowError;

/// Execute the debug command
pub fn execute_debug_command(
    config: &Config,
    suite: &SuiteArgs,
    filter: &str,
    stdout: &Path,
    stderr: &Path,
) -> Result<ExitCode> {
    let filter: Filter = filter.parse().map_err(HarrowError::from)?;
    let result = debug_test(
        &suite.harrowfile,
        suite.build_root.as_deref(),
        filter.clone(),
        config,
        Arc::new(ConsoleDebugger),
        stdout,
        stderr,
    )
    .map_err(HarrowError::from)?;

    println!("{filter}  ->  {result}");
    Ok(if result.good() {
        ExitCode::SUCCESS
    } else {
        ExitCode::TESTS_FAILED
    })
}
