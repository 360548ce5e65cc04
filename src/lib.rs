//! harrow - run test suites of isolated test programs
//!
//! harrow loads a `Harrowfile` describing test programs, lists their test
//! cases through the program's test interface (`atf`, `plain` or `tap`), runs
//! each case in its own process group and work directory, and records every
//! result in a SQLite results file.
//!
//! harrow can be used in two ways:
//! - **CLI**: `harrow test`, `harrow list`, `harrow debug`, `harrow report`
//! - **Library**: drive the crates below directly
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Run every test case of the suite in the current directory
//! harrow test
//!
//! # Show the failures of the latest run
//! harrow report
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::path::Path;
//! use harrow::Config;
//! use harrow::drivers::{RunHooks, run_tests};
//! use harrow::engine::{FilterSet, TestResultHandle};
//!
//! struct Quiet;
//! impl RunHooks for Quiet {
//!     fn got_test_case(&mut self, _handle: &TestResultHandle) {}
//! }
//!
//! let config = Config::builder().parallelism(4).build().expect("config");
//! let run = run_tests(
//!     Path::new("Harrowfile"),
//!     None,
//!     None,
//!     FilterSet::default(),
//!     &config,
//!     &mut Quiet,
//! )
//! .expect("run");
//! println!("{} good, {} bad", run.good_count, run.bad_count);
//! ```
//!
//! # Crate layout
//!
//! - [`model`]: test programs, cases, metadata and results
//! - [`engine`]: scheduler, test interfaces, scanner and Harrowfile loading
//! - [`store`]: the SQLite results file
//! - [`drivers`]: the test, list, debug and report workflows
//! - [`config`]: configuration discovery and overrides

pub mod cli;
pub mod console;
pub mod error;

/// Configuration with precedence: `-v` overrides > config file > defaults.
///
/// Use [`Config::discover()`] for CLI-like behavior or [`Config::builder()`]
/// for programmatic configuration.
pub use harrow_config::Config;

/// Builder for programmatic configuration.
///
/// ```rust,no_run
/// use harrow::Config;
/// use std::time::Duration;
///
/// let config = Config::builder()
///     .parallelism(8)
///     .list_timeout(Duration::from_secs(60))
///     .work_root("/var/tmp/harrow")
///     .build()
///     .expect("Failed to build config");
/// ```
pub use harrow_config::ConfigBuilder;

/// Configuration inputs taken from the command line.
pub use harrow_config::CliArgs;

/// Top-level error of the CLI; maps to an [`ExitCode`] via
/// [`to_exit_code()`](HarrowError::to_exit_code).
pub use error::HarrowError;

/// Exit codes of the `harrow` binary.
///
/// The numeric values are part of the public API.
pub use harrow_utils::exit_codes::ExitCode;

pub use harrow_utils::error::{ErrorCategory, UserFriendlyError};

#[doc(hidden)]
pub use harrow_config as config;
#[doc(hidden)]
pub use harrow_drivers as drivers;
#[doc(hidden)]
pub use harrow_engine as engine;
#[doc(hidden)]
pub use harrow_model as model;
#[doc(hidden)]
pub use harrow_runner as runner;
#[doc(hidden)]
pub use harrow_store as store;

#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub use harrow_utils::test_support;
