use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::model::{Config, ConfigSource};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use harrow_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .parallelism(4)
    ///     .list_timeout(Duration::from_secs(30))
    ///     .test_suite_var("net", "host", "localhost")
    ///     .build()
    ///     .expect("valid configuration");
    /// assert_eq!(config.parallelism, 4);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration of harrow.
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`; anything unset keeps its default.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    architecture: Option<String>,
    platform: Option<String>,
    parallelism: Option<usize>,
    unprivileged_user: Option<String>,
    list_timeout: Option<Duration>,
    cleanup_timeout: Option<Duration>,
    work_root: Option<PathBuf>,
    store_dir: Option<PathBuf>,
    test_suites: BTreeMap<String, BTreeMap<String, String>>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = Some(architecture.into());
        self
    }

    #[must_use]
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    #[must_use]
    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    #[must_use]
    pub fn unprivileged_user(mut self, user: impl Into<String>) -> Self {
        self.unprivileged_user = Some(user.into());
        self
    }

    #[must_use]
    pub fn list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cleanup_timeout(mut self, timeout: Duration) -> Self {
        self.cleanup_timeout = Some(timeout);
        self
    }

    /// Directory under which scheduler work roots are created.
    #[must_use]
    pub fn work_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_root = Some(path.into());
        self
    }

    #[must_use]
    pub fn store_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(path.into());
        self
    }

    #[must_use]
    pub fn test_suite_var(
        mut self,
        suite: impl Into<String>,
        var: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.test_suites
            .entry(suite.into())
            .or_default()
            .insert(var.into(), value.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        fn mark(config: &mut Config, key: &str) {
            config
                .source_attribution
                .insert(key.to_string(), ConfigSource::Programmatic);
        }

        let mut config = Config::default();

        if let Some(architecture) = self.architecture {
            config.architecture = architecture;
            mark(&mut config, "architecture");
        }
        if let Some(platform) = self.platform {
            config.platform = platform;
            mark(&mut config, "platform");
        }
        if let Some(parallelism) = self.parallelism {
            config.parallelism = parallelism;
            mark(&mut config, "parallelism");
        }
        if let Some(user) = self.unprivileged_user {
            config.unprivileged_user = Some(user);
            mark(&mut config, "unprivileged_user");
        }
        if let Some(timeout) = self.list_timeout {
            config.list_timeout = timeout;
            mark(&mut config, "list_timeout");
        }
        if let Some(timeout) = self.cleanup_timeout {
            config.cleanup_timeout = timeout;
            mark(&mut config, "cleanup_timeout");
        }
        if let Some(path) = self.work_root {
            config.work_root = path;
            mark(&mut config, "work_root");
        }
        if let Some(path) = self.store_dir {
            config.store_dir = path;
            mark(&mut config, "store_dir");
        }
        for (suite, vars) in self.test_suites {
            for (var, value) in vars {
                mark(&mut config, &format!("test_suites.{suite}.{var}"));
                config
                    .test_suites
                    .entry(suite.clone())
                    .or_default()
                    .insert(var, value);
            }
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_attribution() {
        let config = Config::builder()
            .parallelism(2)
            .work_root("/scratch")
            .build()
            .unwrap();

        assert_eq!(config.parallelism, 2);
        assert_eq!(config.work_root, PathBuf::from("/scratch"));
        assert_eq!(config.source_of("parallelism"), ConfigSource::Programmatic);
        assert_eq!(config.source_of("list_timeout"), ConfigSource::Defaults);
    }

    #[test]
    fn test_builder_validates() {
        assert!(Config::builder().parallelism(0).build().is_err());
    }

    #[test]
    fn test_builder_suite_vars() {
        let config = Config::builder()
            .test_suite_var("s", "a", "1")
            .test_suite_var("s", "b", "2")
            .build()
            .unwrap();
        assert_eq!(config.test_suite_vars("s").len(), 2);
        assert!(config.has_test_suite_var("s", "a"));
        assert!(!config.has_test_suite_var("other", "a"));
    }
}
