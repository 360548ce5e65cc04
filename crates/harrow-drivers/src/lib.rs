//! High-level operations behind the harrow commands.
//!
//! Each driver loads a suite, walks the matching test cases and reports
//! progress through a hooks trait, leaving presentation to the caller.

pub mod debug;
pub mod error;
pub mod list;
pub mod report;
pub mod run;

use std::path::{Path, PathBuf};

use harrow_engine::EngineError;

pub use debug::debug_test;
pub use error::DriverError;
pub use list::{ListHooks, list_tests};
pub use report::{ScanHooks, scan_results};
pub use run::{RunHooks, RunResult, run_tests};

/// The directory test programs of `harrowfile` resolve against.
pub fn suite_root(harrowfile: &Path, build_root: Option<&Path>) -> Result<PathBuf, DriverError> {
    let top_dir = harrowfile
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let root = build_root.unwrap_or(top_dir);
    root.canonicalize().map_err(|e| {
        DriverError::from(EngineError::Harrowfile {
            path: harrowfile.to_path_buf(),
            reason: format!("invalid root {}: {e}", root.display()),
        })
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::PathBuf;
    use std::time::Duration;

    use harrow_config::Config;
    use harrow_engine::HARROWFILE;
    use harrow_utils::test_support::write_file;
    use tempfile::TempDir;

    /// A suite directory plus a private work root and store.
    pub(crate) struct Suite {
        pub(crate) dir: TempDir,
        _state: TempDir,
        pub(crate) config: Config,
    }

    impl Suite {
        pub(crate) fn new(parallelism: usize) -> Self {
            let state = TempDir::new().unwrap();
            let config = Config::builder()
                .work_root(state.path().join("work"))
                .store_dir(state.path().join("store"))
                .parallelism(parallelism)
                .list_timeout(Duration::from_secs(10))
                .cleanup_timeout(Duration::from_secs(5))
                .build()
                .unwrap();
            Self {
                dir: TempDir::new().unwrap(),
                _state: state,
                config,
            }
        }

        pub(crate) fn harrowfile(&self, contents: &str) -> PathBuf {
            write_file(self.dir.path(), HARROWFILE, contents)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_suite_root_defaults_to_harrowfile_dir() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Harrowfile");
        assert_eq!(
            suite_root(&file, None).unwrap(),
            dir.path().canonicalize().unwrap()
        );

        let build = TempDir::new().unwrap();
        assert_eq!(
            suite_root(&file, Some(build.path())).unwrap(),
            build.path().canonicalize().unwrap()
        );
        assert!(suite_root(&file, Some(&dir.path().join("missing"))).is_err());
    }
}
