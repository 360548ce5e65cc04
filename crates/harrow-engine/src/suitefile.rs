//! Harrowfile loading.
//!
//! A Harrowfile is TOML describing the test programs of a directory:
//!
//! ```toml
//! test_suite = "fs"
//! include = ["net/Harrowfile"]
//!
//! [[test_program]]
//! interface = "atf"
//! name = "t_mount"
//! timeout = 60
//! required_programs = ["mount", "/sbin/umount"]
//! custom.owner = "storage"
//! ```
//!
//! Program names are relative to the directory of the Harrowfile declaring
//! them; included files inherit the test suite name unless they set one.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use harrow_config::Config;
use harrow_model::{MetadataBuilder, TestProgram};
use serde::Deserialize;

use crate::error::EngineError;
use crate::scheduler::Scheduler;

/// Default file name looked up in a suite directory.
pub const HARROWFILE: &str = "Harrowfile";

/// Table whose keys become `custom.<key>` properties.
const CUSTOM_TABLE: &str = "custom";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHarrowfile {
    test_suite: Option<String>,
    #[serde(default)]
    include: Vec<PathBuf>,
    #[serde(default)]
    test_program: Vec<RawProgram>,
}

#[derive(Debug, Deserialize)]
struct RawProgram {
    interface: String,
    name: PathBuf,
    test_suite: Option<String>,
    #[serde(flatten)]
    properties: BTreeMap<String, toml::Value>,
}

fn value_to_property(value: &toml::Value) -> Result<String, String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Array(items) => items
            .iter()
            .map(value_to_property)
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.join(" ")),
        other => Err(format!("unsupported value {other}")),
    }
}

/// Flatten `custom = { owner = "x" }` into `custom.owner`.
fn flatten_properties(
    properties: &BTreeMap<String, toml::Value>,
) -> Result<Vec<(String, String)>, String> {
    let mut flat = Vec::new();
    for (name, value) in properties {
        match value {
            toml::Value::Table(table) if name == CUSTOM_TABLE => {
                for (key, value) in table {
                    flat.push((format!("{name}.{key}"), value_to_property(value)?));
                }
            }
            other => flat.push((name.clone(), value_to_property(other)?)),
        }
    }
    Ok(flat)
}

struct Loader<'a> {
    root: PathBuf,
    scheduler: &'a Scheduler,
    config: &'a Config,
    visited: BTreeSet<PathBuf>,
    seen_programs: BTreeSet<PathBuf>,
    programs: Vec<Arc<TestProgram>>,
}

impl Loader<'_> {
    /// Load `file`, found at `rel_dir` below the top directory.
    fn load(&mut self, file: &Path, rel_dir: &Path, inherited_suite: Option<&str>) -> Result<(), EngineError> {
        let canonical = file
            .canonicalize()
            .map_err(|e| EngineError::harrowfile(file, format!("cannot open: {e}")))?;
        if !self.visited.insert(canonical) {
            return Err(EngineError::harrowfile(file, "included more than once"));
        }

        let text = std::fs::read_to_string(file)
            .map_err(|e| EngineError::harrowfile(file, format!("cannot read: {e}")))?;
        let raw: RawHarrowfile =
            toml::from_str(&text).map_err(|e| EngineError::harrowfile(file, e.message()))?;
        tracing::debug!(path = %file.display(), programs = raw.test_program.len(), "loaded Harrowfile");

        let suite = raw.test_suite.as_deref().or(inherited_suite);
        for program in &raw.test_program {
            self.add_program(file, rel_dir, suite, program)?;
        }

        let dir = file.parent().unwrap_or_else(|| Path::new("."));
        for include in &raw.include {
            let relative = harrow_utils::paths::normalize_relative(include).ok_or_else(|| {
                EngineError::harrowfile(
                    file,
                    format!("include '{}' must be a relative path inside the suite", include.display()),
                )
            })?;
            let include_dir = relative.parent().unwrap_or_else(|| Path::new(""));
            self.load(&dir.join(&relative), &rel_dir.join(include_dir), suite)?;
        }
        Ok(())
    }

    fn add_program(
        &mut self,
        file: &Path,
        rel_dir: &Path,
        suite: Option<&str>,
        raw: &RawProgram,
    ) -> Result<(), EngineError> {
        self.scheduler
            .ensure_valid_interface(&raw.interface)
            .map_err(|e| EngineError::harrowfile(file, e.to_string()))?;

        let name = harrow_utils::paths::normalize_relative(&raw.name).ok_or_else(|| {
            EngineError::harrowfile(
                file,
                format!(
                    "test program name '{}' must be relative and may not contain '..'",
                    raw.name.display()
                ),
            )
        })?;
        let relative_path = rel_dir.join(name);

        let suite = raw.test_suite.as_deref().or(suite).ok_or_else(|| {
            EngineError::harrowfile(
                file,
                format!("no test suite defined for '{}'", relative_path.display()),
            )
        })?;

        let absolute = self.root.join(&relative_path);
        if !absolute.is_file() {
            return Err(EngineError::harrowfile(
                file,
                format!("non-existent test program '{}'", absolute.display()),
            ));
        }
        if !self.seen_programs.insert(relative_path.clone()) {
            return Err(EngineError::harrowfile(
                file,
                format!("duplicate test program '{}'", relative_path.display()),
            ));
        }

        let properties = flatten_properties(&raw.properties)
            .map_err(|reason| EngineError::harrowfile(file, reason))?;
        let mut builder = MetadataBuilder::new();
        for (property, value) in &properties {
            builder
                .set(property, value)
                .map_err(|e| EngineError::harrowfile(file, e.to_string()))?;
        }

        self.programs.push(Arc::new(TestProgram::lazy(
            raw.interface.clone(),
            relative_path,
            self.root.clone(),
            suite,
            builder.build(),
            self.scheduler.lister(self.config),
        )));
        Ok(())
    }
}

/// Load the programs declared by `harrowfile` and everything it includes.
///
/// Programs resolve against `build_root` when given, else against the
/// directory of `harrowfile`. The returned programs list their test cases
/// lazily through `scheduler`.
pub fn load_harrowfile(
    harrowfile: &Path,
    build_root: Option<&Path>,
    scheduler: &Scheduler,
    config: &Config,
) -> Result<Vec<Arc<TestProgram>>, EngineError> {
    let top_dir = harrowfile
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let root = build_root.unwrap_or(top_dir);
    let root = root
        .canonicalize()
        .map_err(|e| EngineError::harrowfile(harrowfile, format!("invalid root {}: {e}", root.display())))?;

    let mut loader = Loader {
        root,
        scheduler,
        config,
        visited: BTreeSet::new(),
        seen_programs: BTreeSet::new(),
        programs: Vec::new(),
    };
    loader.load(harrowfile, Path::new(""), None)?;
    Ok(loader.programs)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use harrow_model::RequiredUser;
    use harrow_utils::test_support::{write_file, write_script};
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        suite: TempDir,
        _work: TempDir,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let work = TempDir::new().unwrap();
            let config = Config::builder().work_root(work.path()).build().unwrap();
            Self {
                suite: TempDir::new().unwrap(),
                _work: work,
                config,
            }
        }

        fn load(&self) -> Result<Vec<Arc<TestProgram>>, EngineError> {
            let scheduler = Scheduler::setup(&self.config).unwrap();
            load_harrowfile(
                &self.suite.path().join(HARROWFILE),
                None,
                &scheduler,
                &self.config,
            )
        }
    }

    #[test]
    #[serial(interrupts)]
    fn test_programs_and_metadata() {
        let fx = Fixture::new();
        write_script(fx.suite.path(), "t_one", "exit 0");
        write_script(fx.suite.path(), "t_two", "exit 0");
        write_file(
            fx.suite.path(),
            HARROWFILE,
            r#"
test_suite = "fs"

[[test_program]]
interface = "plain"
name = "t_one"
timeout = 42
required_user = "root"
is_exclusive = true
custom.owner = "storage"

[[test_program]]
interface = "atf"
name = "./t_two"
test_suite = "other"
allowed_platforms = ["linux", "netbsd"]
"#,
        );

        let programs = fx.load().unwrap();
        assert_eq!(programs.len(), 2);

        let one = &programs[0];
        assert_eq!(one.interface_name(), "plain");
        assert_eq!(one.relative_path(), Path::new("t_one"));
        assert_eq!(one.test_suite_name(), "fs");
        assert_eq!(one.metadata().timeout, Duration::from_secs(42));
        assert_eq!(one.metadata().required_user, RequiredUser::Root);
        assert!(one.metadata().is_exclusive);
        assert_eq!(one.metadata().custom["owner"], "storage");
        assert!(!one.is_listed());

        let two = &programs[1];
        assert_eq!(two.relative_path(), Path::new("t_two"));
        assert_eq!(two.test_suite_name(), "other");
        assert_eq!(two.metadata().allowed_platforms.len(), 2);
    }

    #[test]
    #[serial(interrupts)]
    fn test_includes_inherit_suite() {
        let fx = Fixture::new();
        write_script(fx.suite.path(), "net/t_net", "exit 0");
        write_file(
            fx.suite.path(),
            HARROWFILE,
            "test_suite = \"top\"\ninclude = [\"net/Harrowfile\"]\n",
        );
        write_file(
            fx.suite.path(),
            "net/Harrowfile",
            "[[test_program]]\ninterface = \"plain\"\nname = \"t_net\"\n",
        );

        let programs = fx.load().unwrap();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].relative_path(), Path::new("net/t_net"));
        assert_eq!(programs[0].test_suite_name(), "top");
        assert_eq!(programs[0].absolute_path(), programs[0].root().join("net/t_net"));
    }

    #[test]
    #[serial(interrupts)]
    fn test_rejections() {
        let cases = [
            ("[[test_program]]\ninterface = \"plain\"\nname = \"missing\"\ntest_suite = \"s\"\n", "non-existent"),
            ("[[test_program]]\ninterface = \"junit\"\nname = \"t\"\ntest_suite = \"s\"\n", "Unknown test interface"),
            ("[[test_program]]\ninterface = \"plain\"\nname = \"/bin/t\"\ntest_suite = \"s\"\n", "must be relative"),
            ("[[test_program]]\ninterface = \"plain\"\nname = \"t\"\n", "no test suite"),
            ("[[test_program]]\ninterface = \"plain\"\nname = \"t\"\ntest_suite = \"s\"\ncolour = \"red\"\n", "colour"),
            ("test_suite = \"s\"\n[[test_program]]\ninterface = \"plain\"\nname = \"t\"\n[[test_program]]\ninterface = \"plain\"\nname = \"t\"\n", "duplicate"),
            ("include = [\"Harrowfile\"]\n", "more than once"),
            ("bogus = 1\n", "bogus"),
        ];

        for (contents, needle) in cases {
            let fx = Fixture::new();
            write_script(fx.suite.path(), "t", "exit 0");
            write_file(fx.suite.path(), HARROWFILE, contents);
            let err = fx.load().unwrap_err().to_string();
            assert!(err.contains(needle), "{err:?} should mention {needle:?}");
        }
    }
}
