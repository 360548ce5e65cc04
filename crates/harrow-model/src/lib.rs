//! Core data model: test programs, their test cases, metadata and results.
//!
//! A [`TestProgram`] is identified by its interface, its path relative to the
//! suite root, the root itself and its test suite name. Its test cases are
//! either given up front or fetched lazily through a [`TestCaseLister`].

pub mod context;
pub mod debugger;
pub mod error;
pub mod metadata;
pub mod result;
pub mod test_case;
pub mod test_program;

pub use context::Context;
pub use debugger::Debugger;
pub use error::ModelError;
pub use metadata::{Metadata, MetadataBuilder, MetadataOverrides, RequiredUser};
pub use result::{TestResult, TestResultType};
pub use test_case::{TestCase, TestCaseSpec, TestCasesMap};
pub use test_program::{LIST_FAILURE_CASE, TestCaseLister, TestProgram};
