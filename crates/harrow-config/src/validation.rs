use crate::error::ConfigError;
use crate::model::Config;

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.parallelism == 0 {
            return Err(ConfigError::invalid("parallelism", "must be at least 1"));
        }
        if self.architecture.trim().is_empty() {
            return Err(ConfigError::invalid("architecture", "must not be empty"));
        }
        if self.platform.trim().is_empty() {
            return Err(ConfigError::invalid("platform", "must not be empty"));
        }
        if self.list_timeout.is_zero() {
            return Err(ConfigError::invalid("list_timeout", "must be greater than 0"));
        }
        if self.cleanup_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "cleanup_timeout",
                "must be greater than 0",
            ));
        }
        if self.work_root.as_os_str().is_empty() {
            return Err(ConfigError::invalid("work_root", "must not be empty"));
        }
        if self.store_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("store_dir", "must not be empty"));
        }
        Ok(())
    }
}
