use serde::{Deserialize, Serialize};
use std::fmt;

/// How a child process terminated.
///
/// A timed-out child has no `ProcessStatus` at all; callers model that as
/// `Option<ProcessStatus>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessStatus {
    /// The process called `exit()` with this code.
    Exited(i32),
    /// The process was terminated by this signal.
    Signaled { signal: i32, core_dumped: bool },
}

impl ProcessStatus {
    /// Synthetic clean exit, used where an interface needs no process at all.
    #[must_use]
    pub const fn success() -> Self {
        Self::Exited(0)
    }

    #[must_use]
    pub const fn exited(&self) -> bool {
        matches!(self, Self::Exited(_))
    }

    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::Signaled { .. } => None,
        }
    }

    #[must_use]
    pub const fn signaled(&self) -> bool {
        matches!(self, Self::Signaled { .. })
    }

    #[must_use]
    pub const fn term_signal(&self) -> Option<i32> {
        match self {
            Self::Signaled { signal, .. } => Some(*signal),
            Self::Exited(_) => None,
        }
    }

    #[must_use]
    pub const fn core_dumped(&self) -> bool {
        matches!(
            self,
            Self::Signaled {
                core_dumped: true,
                ..
            }
        )
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl From<std::process::ExitStatus> for ProcessStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signaled {
                    signal,
                    core_dumped: status.core_dumped(),
                };
            }
        }

        // Neither an exit code nor a signal: treat as an abnormal exit.
        Self::Exited(-1)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signaled {
                signal,
                core_dumped,
            } => {
                write!(f, "received signal {signal}")?;
                if *core_dumped {
                    write!(f, " (core dumped)")?;
                }
                Ok(())
            }
        }
    }
}
