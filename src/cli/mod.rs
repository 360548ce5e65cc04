//! Command-line interface for harrow
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions (clap)
//! - `run`: entry point, configuration discovery and dispatch
//! - `commands`: command implementations
//! - `tests`: argument parsing and command tests (cfg(test) only)

pub mod args;
mod commands;
mod run;

#[cfg(test)]
mod tests;

pub use args::{Cli, Commands};
pub use run::run;
