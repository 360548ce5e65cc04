/// Send `SIGKILL` to the process group led by `pid`.
///
/// Children are spawned as group leaders, so this also reaches anything they
/// forked. A group that is already gone is not an error.
#[cfg(unix)]
pub fn terminate_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(err) => tracing::debug!(pid, error = %err, "killpg failed"),
    }
}

#[cfg(not(unix))]
pub fn terminate_group(pid: u32) {
    tracing::warn!(pid, "process-group termination is unsupported on this platform");
}
