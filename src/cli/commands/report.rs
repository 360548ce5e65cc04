//! Report command implementation
//!
//! Reads a results file, by default the newest one recorded for the suite in
//! the current directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use harrow_config::Config;
use harrow_drivers::{scan_results, suite_root};
use harrow_engine::HARROWFILE;
use harrow_store::find_latest;
use harrow_utils::exit_codes::ExitCode;

use super::common::{outcome_code, parse_filters, parse_result_types};
use crate::console::ReportConsole;
use crate::error::HarrowError;

fn latest_results_file(config: &Config) -> Result<PathBuf> {
    let root = suite_root(Path::new(HARROWFILE), None).map_err(HarrowError::from)?;
    find_latest(&config.store_dir, &root)
        .map_err(HarrowError::from)
        .with_context(|| format!("looking for results in {}", config.store_dir.display()))
}

/// Execute the report command
pub fn execute_report_command(
    config: &Config,
    results_file: Option<&Path>,
    results_filter: &str,
    filters: &[String],
) -> Result<ExitCode> {
    let shown = parse_result_types(results_filter).map_err(HarrowError::from)?;
    let filters = parse_filters(filters)?;
    let results_file = match results_file {
        Some(path) => path.to_path_buf(),
        None => latest_results_file(config)?,
    };

    let mut console = ReportConsole::new(std::io::stdout().lock(), &results_file, shown);
    let unused = scan_results(&results_file, &filters, &mut console)
        .map_err(HarrowError::from)
        .with_context(|| format!("reading {}", results_file.display()))?;
    Ok(outcome_code(console.bad_count(), &unused))
}
