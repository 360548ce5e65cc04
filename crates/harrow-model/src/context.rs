use std::collections::BTreeMap;
use std::path::PathBuf;

/// Snapshot of the environment a run was started from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Context {
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl Context {
    #[must_use]
    pub fn new(cwd: PathBuf, env: BTreeMap<String, String>) -> Self {
        Self { cwd, env }
    }

    /// Capture the current working directory and every UTF-8 environment
    /// variable.
    pub fn current() -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;
        let env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Ok(Self { cwd, env })
    }
}
