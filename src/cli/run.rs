//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, installs logging, discovers the configuration,
//! dispatches to a command and prints any error. main.rs only maps the
//! returned code to the process exit status.

use anyhow::Error;
use clap::Parser;

use harrow_config::{CliArgs, Config};
use harrow_utils::error::render_for_user;
use harrow_utils::exit_codes::ExitCode;
use harrow_utils::logging::init_tracing;

use super::args::{Cli, Commands};
use super::commands;
use crate::error::HarrowError;

/// Print `err` for the user and pick the exit code it maps to.
fn report_error(err: &Error) -> ExitCode {
    match err.downcast_ref::<HarrowError>() {
        Some(harrow) => {
            eprintln!("{}", render_for_user(harrow));
            let outer = err.to_string();
            if outer != harrow.to_string() {
                eprintln!("  while: {outer}");
            }
            harrow.to_exit_code()
        }
        None => {
            eprintln!("✗ {err:#}");
            ExitCode::INTERNAL
        }
    }
}

/// Main CLI execution function.
///
/// Handles all output including errors and returns the exit code of any
/// unsuccessful outcome.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("warning: cannot initialize logging: {e}");
    }

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        overrides: cli.variables.clone(),
    };
    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = HarrowError::from(err);
            eprintln!("{}", render_for_user(&err));
            return Err(err.to_exit_code());
        }
    };

    tracing::debug!(command = ?cli.command, "dispatching");
    let outcome = match cli.command {
        Commands::Test {
            suite,
            results_file,
            filters,
        } => commands::execute_test_command(&config, &suite, results_file.as_deref(), &filters),
        Commands::List {
            suite,
            verbose_list,
            filters,
        } => commands::execute_list_command(&config, &suite, verbose_list, &filters),
        Commands::Debug {
            suite,
            stdout,
            stderr,
            filter,
        } => commands::execute_debug_command(&config, &suite, &filter, &stdout, &stderr),
        Commands::Report {
            results_file,
            results_filter,
            filters,
        } => commands::execute_report_command(&config, results_file.as_deref(), &results_filter, &filters),
        Commands::Config { json } => commands::execute_config_command(&config, json),
    };

    match outcome {
        Ok(code) if code.is_success() => Ok(()),
        Ok(code) => Err(code),
        Err(err) => Err(report_error(&err)),
    }
}
