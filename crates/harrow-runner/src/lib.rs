//! Child-process execution for harrow.
//!
//! Every test program, listing step, and cleanup step runs through this crate:
//! argv-only [`CommandSpec`]s, stdout/stderr redirected to files, each child in
//! its own process group so a timeout can take down everything it forked.
//!
//! # Security Model
//!
//! All process execution goes through [`CommandSpec`] to ensure argv-style invocation.
//! Arguments are passed as discrete elements rather than shell strings.

pub mod command_spec;
pub mod error;
pub mod exit_handle;
mod platform;
pub mod process;
pub mod status;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use exit_handle::{ExitHandle, elapsed_between};
pub use platform::terminate_group;
pub use process::{OutputFiles, SpawnedChild, run_with_timeout, spawn};
pub use status::ProcessStatus;
