//! Configuration for harrow runs.
//!
//! Values come from, in decreasing precedence: `-v key=value` overrides on
//! the command line, a `.harrow/config.toml` file (explicit or discovered by
//! walking up from the working directory), and built-in defaults. Every value
//! remembers where it came from.

mod builder;
mod discovery;
pub mod error;
mod model;
mod overrides;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use error::ConfigError;
pub use model::{CliArgs, Config, ConfigSource};
pub use overrides::parse_override;
