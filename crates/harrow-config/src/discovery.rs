use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::model::{CliArgs, Config, ConfigSource};

/// Directory holding the per-project configuration file.
pub const CONFIG_DIR: &str = ".harrow";

/// Name of the configuration file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    architecture: Option<String>,
    platform: Option<String>,
    parallelism: Option<i64>,
    unprivileged_user: Option<String>,
    list_timeout: Option<i64>,
    cleanup_timeout: Option<i64>,
    work_root: Option<PathBuf>,
    store_dir: Option<PathBuf>,
    #[serde(default)]
    test_suites: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("cannot determine current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.is_file() {
                    return Err(ConfigError::NotFound {
                        path: explicit.clone(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            tracing::debug!(path = %path.display(), "loading configuration file");
            let file_config = Self::load_config_file(path)?;
            config.apply_file(file_config, path)?;
        }

        config.apply_overrides(&cli_args.overrides)?;
        config.validate()?;
        Ok(config)
    }

    /// Walks up the directory tree looking for `.harrow/config.toml`, stopping
    /// at repository root markers (.git, .hg, .svn) or filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = Some(start_dir);

        while let Some(dir) = current_dir {
            let config_path = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }

            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists()
            {
                break;
            }

            current_dir = dir.parent();
        }

        None
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::InvalidFile {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })
    }

    fn apply_file(&mut self, file: TomlConfig, path: &Path) -> Result<(), ConfigError> {
        let source = ConfigSource::ConfigFile(path.to_path_buf());

        let scalars: [(&str, Option<String>); 8] = [
            ("architecture", file.architecture),
            ("platform", file.platform),
            ("parallelism", file.parallelism.map(|v| v.to_string())),
            ("unprivileged_user", file.unprivileged_user),
            ("list_timeout", file.list_timeout.map(|v| v.to_string())),
            ("cleanup_timeout", file.cleanup_timeout.map(|v| v.to_string())),
            (
                "work_root",
                file.work_root.map(|p| p.to_string_lossy().into_owned()),
            ),
            (
                "store_dir",
                file.store_dir.map(|p| p.to_string_lossy().into_owned()),
            ),
        ];
        for (key, value) in scalars {
            if let Some(value) = value {
                self.set_value(key, &value, source.clone())?;
            }
        }

        for (suite, vars) in file.test_suites {
            for (var, value) in vars {
                let key = format!("test_suites.{suite}.{var}");
                let text = scalar_to_string(&key, &value)?;
                self.set_value(&key, &text, source.clone())?;
            }
        }
        Ok(())
    }
}

fn scalar_to_string(key: &str, value: &toml::Value) -> Result<String, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        _ => Err(ConfigError::invalid(
            key,
            "test suite variables must be strings, numbers or booleans",
        )),
    }
}
