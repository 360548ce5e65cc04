//! Suite fixtures for CLI tests.

use std::path::{Path, PathBuf};

use harrow_config::Config;
use harrow_utils::test_support::{write_file, write_script};
use tempfile::TempDir;

use crate::cli::args::SuiteArgs;

/// A throwaway suite directory plus scratch and store directories.
pub struct SuiteFixture {
    pub suite: TempDir,
    pub scratch: TempDir,
    pub config: Config,
}

impl SuiteFixture {
    pub fn new() -> Self {
        let suite = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let config = Config::builder()
            .work_root(scratch.path().join("work"))
            .store_dir(scratch.path().join("store"))
            .parallelism(2)
            .build()
            .unwrap();
        Self {
            suite,
            scratch,
            config,
        }
    }

    /// Two plain programs: `pass` exits 0 and `fail` exits 1.
    pub fn with_pass_and_fail() -> Self {
        let fx = Self::new();
        write_script(fx.suite.path(), "pass", "exit 0");
        write_script(fx.suite.path(), "fail", "echo oops >&2; exit 1");
        write_file(
            fx.suite.path(),
            "Harrowfile",
            "test_suite = \"demo\"\n\n\
             [[test_program]]\ninterface = \"plain\"\nname = \"pass\"\n\n\
             [[test_program]]\ninterface = \"plain\"\nname = \"fail\"\n",
        );
        fx
    }

    pub fn suite_args(&self) -> SuiteArgs {
        SuiteArgs {
            harrowfile: self.suite.path().join("Harrowfile"),
            build_root: None,
        }
    }

    pub fn results_file(&self) -> PathBuf {
        self.scratch.path().join("results.db")
    }

    pub fn path(&self) -> &Path {
        self.suite.path()
    }
}
