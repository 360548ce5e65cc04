//! Error types for runner module

use std::path::PathBuf;
use thiserror::Error;

/// Child process execution errors
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Failed to wait for process {pid}: {reason}")]
    WaitFailed { pid: u32, reason: String },

    #[error("Cannot open output file {}: {source}", path.display())]
    OutputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Process monitoring thread for {pid} terminated unexpectedly")]
    MonitorLost { pid: u32 },
}
