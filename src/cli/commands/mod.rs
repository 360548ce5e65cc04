//! CLI command implementations (facade).
//!
//! Each command returns the [`ExitCode`](harrow_utils::exit_codes::ExitCode)
//! of a completed run; errors bubble up to `run.rs` for rendering.

mod common;
mod config;
mod debug;
mod list;
mod report;
mod test_cmd;

pub use config::execute_config_command;
pub use debug::execute_debug_command;
pub use list::execute_list_command;
pub use report::execute_report_command;
pub use test_cmd::execute_test_command;

#[cfg(test)]
pub(crate) use common::{outcome_code, parse_result_types};
