//! Execution engine for harrow.
//!
//! The [`Scheduler`] spawns test cases as isolated children and reports their
//! completions; the [`Scanner`] lazily enumerates `(program, case)` pairs
//! matching a [`FilterSet`]. Test programs speak one of the protocols in
//! [`interface`], looked up by name in an [`InterfaceRegistry`].

pub mod error;
pub mod filters;
pub mod interface;
pub mod interrupts;
pub mod requirements;
pub mod scanner;
pub mod scheduler;
pub mod suitefile;

pub use error::{EngineError, InterfaceError};
pub use filters::{Filter, FilterSet};
pub use interface::{InterfaceRegistry, TestInterface, Vars};
pub use interrupts::{check_interrupt, interrupted};
pub use scanner::{ScanResult, Scanner};
pub use scheduler::{
    ExecHandle, ResultHandle, Scheduler, TestResultHandle, current_context,
};
pub use suitefile::{HARROWFILE, load_harrowfile};
