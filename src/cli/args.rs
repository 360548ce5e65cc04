//! CLI argument definitions and parsing structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// harrow - run test suites of isolated test programs
#[derive(Parser, Debug)]
#[command(name = "harrow")]
#[command(about = "Run test suites of isolated test programs and record their results")]
#[command(long_about = r#"
harrow runs the test programs described by a Harrowfile, each test case in
its own process group and work directory, and stores every result in a
SQLite results file that can be reported on later.

EXAMPLES:
  # Run every test case of the suite in the current directory
  harrow test

  # Run a subset, four cases at a time
  harrow -v parallelism=4 test fs/mount net:connect_*

  # See what would run, with metadata
  harrow list --verbose-list fs

  # Run a single case with its output on the terminal
  harrow debug fs/t_mount:remount

  # Show the failures of the latest run
  harrow report

CONFIGURATION:
  Configuration is loaded with precedence: -v overrides > config file > defaults
  The config file is discovered by searching upward from CWD for .harrow/config.toml
  Use --config to name a config file explicitly

EXIT CODES:
  0 success, 1 some test case was not good, 2 usage or configuration error,
  3 internal error, 4 a filter matched no test case, 130 interrupted
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override a configuration value (key=value); may be repeated
    #[arg(short = 'v', long = "variable", value_name = "KEY=VALUE", global = true)]
    pub variables: Vec<String>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options locating the suite, shared by the suite-driven commands.
#[derive(clap::Args, Debug, Clone)]
pub struct SuiteArgs {
    /// Harrowfile describing the test suite
    #[arg(short = 'k', long = "harrowfile", default_value = "Harrowfile")]
    pub harrowfile: PathBuf,

    /// Directory test programs are looked up in, when not next to the Harrowfile
    #[arg(long)]
    pub build_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run test cases and record their results
    Test {
        #[command(flatten)]
        suite: SuiteArgs,

        /// Results file to create (default: a new file in the store directory)
        #[arg(long)]
        results_file: Option<PathBuf>,

        /// Filters of the form path[:case-glob]
        filters: Vec<String>,
    },

    /// List test cases without running them
    List {
        #[command(flatten)]
        suite: SuiteArgs,

        /// Show the metadata of every test case
        #[arg(long)]
        verbose_list: bool,

        /// Filters of the form path[:case-glob]
        filters: Vec<String>,
    },

    /// Run a single test case with its output sent to the terminal
    Debug {
        #[command(flatten)]
        suite: SuiteArgs,

        /// Where the body's stdout goes
        #[arg(long, default_value = "/dev/stdout")]
        stdout: PathBuf,

        /// Where the body's stderr goes
        #[arg(long, default_value = "/dev/stderr")]
        stderr: PathBuf,

        /// Filter selecting exactly one test case
        filter: String,
    },

    /// Report on a previous run
    Report {
        /// Results file to read (default: the latest one for the current directory)
        #[arg(long)]
        results_file: Option<PathBuf>,

        /// Comma-separated result types to list
        #[arg(long, default_value = "skipped,expected_failure,broken,failed")]
        results_filter: String,

        /// Filters of the form path[:case-glob]
        filters: Vec<String>,
    },

    /// Print the effective configuration and where each value came from
    Config {
        /// Emit a JSON object keyed by configuration key
        #[arg(long)]
        json: bool,
    },
}
