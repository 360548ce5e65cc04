use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::command_spec::CommandSpec;
use crate::error::RunnerError;
use crate::platform::terminate_group;
use crate::status::ProcessStatus;

/// Where a child's standard output and error are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
    /// Append instead of truncating; cleanup steps share the body's files.
    pub append: bool,
}

impl OutputFiles {
    #[must_use]
    pub fn new(stdout: impl Into<PathBuf>, stderr: impl Into<PathBuf>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            append: false,
        }
    }

    #[must_use]
    pub fn appending(mut self) -> Self {
        self.append = true;
        self
    }

    fn open(&self, path: &Path) -> Result<File, RunnerError> {
        let mut options = OpenOptions::new();
        options.create(true);
        if self.append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        options.open(path).map_err(|source| RunnerError::OutputFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A running child that has not been waited for yet.
#[derive(Debug)]
pub struct SpawnedChild {
    child: Child,
    pid: u32,
}

/// Start `spec` with stdin from `/dev/null` and output redirected to `outputs`.
pub fn spawn(spec: &CommandSpec, outputs: &OutputFiles) -> Result<SpawnedChild, RunnerError> {
    let stdout = outputs.open(&outputs.stdout)?;
    let stderr = outputs.open(&outputs.stderr)?;

    let mut command = spec.to_command();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));

    let child = command.spawn().map_err(|e| RunnerError::SpawnFailed {
        program: spec.display_program(),
        reason: e.to_string(),
    })?;
    let pid = child.id();
    tracing::trace!(pid, program = %spec.display_program(), "spawned child");

    Ok(SpawnedChild { child, pid })
}

impl SpawnedChild {
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Block until the child exits or `timeout` elapses.
    ///
    /// Returns `Ok(None)` when the deadline passed; the whole process group has
    /// been killed and reaped by then. After a normal exit the group is killed
    /// as well so stray grandchildren do not outlive the test.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Option<ProcessStatus>, RunnerError> {
        let Self { mut child, pid } = self;
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let status = child.wait();
            let _ = tx.send(status);
        });

        match rx.recv_timeout(timeout) {
            Ok(wait_result) => {
                let _ = handle.join();
                terminate_group(pid);
                let status = wait_result.map_err(|e| RunnerError::WaitFailed {
                    pid,
                    reason: e.to_string(),
                })?;
                Ok(Some(ProcessStatus::from(status)))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::debug!(pid, ?timeout, "child timed out; killing process group");
                terminate_group(pid);
                let _ = handle.join();
                Ok(None)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                Err(RunnerError::MonitorLost { pid })
            }
        }
    }
}

/// Spawn `spec` and wait for it with `timeout`.
pub fn run_with_timeout(
    spec: &CommandSpec,
    outputs: &OutputFiles,
    timeout: Duration,
) -> Result<Option<ProcessStatus>, RunnerError> {
    spawn(spec, outputs)?.wait_timeout(timeout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Instant;
    use tempfile::TempDir;

    fn outputs(td: &TempDir) -> OutputFiles {
        OutputFiles::new(td.path().join("stdout.txt"), td.path().join("stderr.txt"))
    }

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("/bin/sh").arg("-c").arg(script)
    }

    #[test]
    fn test_exit_code_and_output_files() {
        let td = TempDir::new().unwrap();
        let files = outputs(&td);
        let status = run_with_timeout(
            &sh("echo out; echo err >&2; exit 8"),
            &files,
            Duration::from_secs(10),
        )
        .unwrap();

        assert_eq!(status, Some(ProcessStatus::Exited(8)));
        assert_eq!(fs::read_to_string(&files.stdout).unwrap(), "out\n");
        assert_eq!(fs::read_to_string(&files.stderr).unwrap(), "err\n");
    }

    #[test]
    fn test_signal_is_reported() {
        let td = TempDir::new().unwrap();
        let status =
            run_with_timeout(&sh("kill -9 $$"), &outputs(&td), Duration::from_secs(10)).unwrap();
        assert_eq!(status.and_then(|s| s.term_signal()), Some(9));
    }

    #[test]
    fn test_timeout_kills_group() {
        let td = TempDir::new().unwrap();
        let marker = td.path().join("survivor");
        let script = format!("(sleep 2; touch {}) & sleep 30", marker.display());

        let start = Instant::now();
        let status =
            run_with_timeout(&sh(&script), &outputs(&td), Duration::from_millis(300)).unwrap();
        assert_eq!(status, None);
        assert!(start.elapsed() < Duration::from_secs(10));

        thread::sleep(Duration::from_secs(3));
        assert!(!marker.exists(), "grandchild outlived the timeout");
    }

    #[test]
    fn test_append_mode_keeps_previous_output() {
        let td = TempDir::new().unwrap();
        let files = outputs(&td);
        run_with_timeout(&sh("echo body"), &files, Duration::from_secs(10)).unwrap();
        run_with_timeout(
            &sh("echo cleanup"),
            &files.clone().appending(),
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(&files.stdout).unwrap(),
            "body\ncleanup\n"
        );
    }

    #[test]
    fn test_stdin_is_null() {
        let td = TempDir::new().unwrap();
        let files = outputs(&td);
        let status =
            run_with_timeout(&sh("cat; echo done"), &files, Duration::from_secs(10)).unwrap();
        assert_eq!(status, Some(ProcessStatus::Exited(0)));
        assert_eq!(fs::read_to_string(&files.stdout).unwrap(), "done\n");
    }

    #[test]
    fn test_spawn_failure() {
        let td = TempDir::new().unwrap();
        let err = spawn(
            &CommandSpec::new(td.path().join("does-not-exist")),
            &outputs(&td),
        )
        .unwrap_err();
        assert!(matches!(err, RunnerError::SpawnFailed { .. }));
    }
}
