//! List command implementation

use anyhow::Result;
use harrow_config::Config;
use harrow_drivers::list_tests;
use harrow_utils::exit_codes::ExitCode;

use super::common::{outcome_code, parse_filters};
use crate::cli::args::SuiteArgs;
use crate::console::ListConsole;
use crate::error::HarrowError;

/// Execute the list command
pub fn execute_list_command(
    config: &Config,
    suite: &SuiteArgs,
    verbose: bool,
    filters: &[String],
) -> Result<ExitCode> {
    let filters = parse_filters(filters)?;
    let mut console = ListConsole::new(std::io::stdout().lock(), verbose);
    let unused = list_tests(
        &suite.harrowfile,
        suite.build_root.as_deref(),
        filters,
        config,
        &mut console,
    )
    .map_err(HarrowError::from)?;
    Ok(outcome_code(0, &unused))
}
