//! CLI tests module (manifest).
//!
//! Split by concern under `src/cli/tests/*`.

mod support;

mod args;
