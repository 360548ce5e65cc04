use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

// ============================================================================
// CommandSpec - Argv-only Process Execution Specification
// ============================================================================

/// Specification for a command to execute.
///
/// Test interfaces describe the program to run as a `CommandSpec`; the runner
/// turns it into a `Command` placed in its own process group.
///
/// # Example
///
/// ```rust
/// use harrow_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("/suite/bin/prog")
///     .arg("-l")
///     .cwd("/tmp/work");
///
/// assert_eq!(cmd.program, OsString::from("/suite/bin/prog"));
/// assert_eq!(cmd.args.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<OsString>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
    /// Optional environment overrides
    pub env: Option<HashMap<OsString, OsString>>,
    /// Variables removed from the inherited environment
    pub env_remove: Vec<OsString>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set an environment variable for the command.
    ///
    /// Setting a variable also cancels any earlier removal of it.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        let key = key.into();
        self.env_remove.retain(|removed| removed != &key);
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key, value.into());
        self
    }

    #[must_use]
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        for (key, value) in envs {
            self = self.env(key, value);
        }
        self
    }

    /// Remove a variable from the environment the child inherits.
    #[must_use]
    pub fn env_remove(mut self, key: impl Into<OsString>) -> Self {
        let key = key.into();
        if let Some(env) = self.env.as_mut() {
            env.remove(&key);
        }
        if !self.env_remove.contains(&key) {
            self.env_remove.push(key);
        }
        self
    }

    /// Apply the standard test-child environment rooted at `work_directory`.
    ///
    /// The child runs inside `work_directory` with `HOME` and `TMPDIR` pointing
    /// at it, `TZ=UTC`, and every locale variable (`LANG`, `LC_*`) removed.
    #[must_use]
    pub fn isolate(self, work_directory: &Path) -> Self {
        let locale_vars: Vec<OsString> = std::env::vars_os()
            .map(|(key, _)| key)
            .filter(|key| is_locale_var(key))
            .collect();

        let mut spec = self
            .cwd(work_directory)
            .env("HOME", work_directory)
            .env("TMPDIR", work_directory)
            .env("TZ", "UTC")
            .env_remove("LANG");
        for key in locale_vars {
            spec = spec.env_remove(key);
        }
        spec
    }

    /// Convert this `CommandSpec` into a `std::process::Command`.
    ///
    /// On Unix the child becomes the leader of a new process group so the
    /// whole group can be signalled on timeout.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        for key in &self.env_remove {
            cmd.env_remove(key);
        }

        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd
    }

    /// Program name for log lines and error messages.
    #[must_use]
    pub fn display_program(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

fn is_locale_var(key: &OsStr) -> bool {
    key.to_str()
        .is_some_and(|name| name == "LANG" || name.starts_with("LC_"))
}
