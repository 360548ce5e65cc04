use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::status::ProcessStatus;

/// Everything known about a finished child, handed to debuggers and result
/// computation before its work directory is released.
#[derive(Debug, Clone)]
pub struct ExitHandle {
    /// `None` when the child was killed for exceeding its timeout.
    pub status: Option<ProcessStatus>,
    pub work_directory: PathBuf,
    pub stdout_file: PathBuf,
    pub stderr_file: PathBuf,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ExitHandle {
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    #[must_use]
    pub fn work_directory(&self) -> &Path {
        &self.work_directory
    }

    /// Wall-clock run time; a clock step backwards yields zero.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        elapsed_between(self.start_time, self.end_time)
    }
}

/// `end - start`, clamped at zero.
#[must_use]
pub fn elapsed_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    (end - start).to_std().unwrap_or(Duration::ZERO)
}
