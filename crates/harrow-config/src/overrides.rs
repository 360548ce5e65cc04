use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::model::{Config, ConfigSource};

/// Keys holding a single value; `test_suites.*` keys are handled separately.
pub(crate) const SCALAR_KEYS: &[&str] = &[
    "architecture",
    "platform",
    "parallelism",
    "unprivileged_user",
    "list_timeout",
    "cleanup_timeout",
    "work_root",
    "store_dir",
];

const SUITE_PREFIX: &str = "test_suites.";

/// Split a `key=value` override.
pub fn parse_override(raw: &str) -> Result<(String, String), ConfigError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::MalformedOverride(raw.to_string())),
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{value}' is not a whole number of seconds")))?;
    Ok(Duration::from_secs(secs))
}

impl Config {
    /// Set one value from its string form and record `source` for it.
    pub fn set_value(
        &mut self,
        key: &str,
        value: &str,
        source: ConfigSource,
    ) -> Result<(), ConfigError> {
        if let Some(rest) = key.strip_prefix(SUITE_PREFIX) {
            let (suite, var) = rest
                .split_once('.')
                .filter(|(suite, var)| !suite.is_empty() && !var.is_empty())
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
            self.test_suites
                .entry(suite.to_string())
                .or_default()
                .insert(var.to_string(), value.to_string());
            self.source_attribution.insert(key.to_string(), source);
            return Ok(());
        }

        match key {
            "architecture" => self.architecture = value.to_string(),
            "platform" => self.platform = value.to_string(),
            "parallelism" => {
                self.parallelism = value.trim().parse().map_err(|_| {
                    ConfigError::invalid(key, format!("'{value}' is not a positive integer"))
                })?;
            }
            "unprivileged_user" => {
                self.unprivileged_user = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "list_timeout" => self.list_timeout = parse_seconds(key, value)?,
            "cleanup_timeout" => self.cleanup_timeout = parse_seconds(key, value)?,
            "work_root" => self.work_root = PathBuf::from(value),
            "store_dir" => self.store_dir = PathBuf::from(value),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        self.source_attribution.insert(key.to_string(), source);
        Ok(())
    }

    /// Apply raw `key=value` overrides from the command line, in order.
    pub fn apply_overrides(&mut self, overrides: &[String]) -> Result<(), ConfigError> {
        for raw in overrides {
            let (key, value) = parse_override(raw)?;
            tracing::debug!(%key, %value, "applying configuration override");
            self.set_value(&key, &value, ConfigSource::Cli)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("parallelism=4").unwrap(),
            ("parallelism".to_string(), "4".to_string())
        );
        assert_eq!(
            parse_override("test_suites.s.x=a=b").unwrap(),
            ("test_suites.s.x".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_override("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_override("novalue").is_err());
        assert!(parse_override("=value").is_err());
    }

    #[test]
    fn test_overrides_set_values_and_sources() {
        let mut config = Config::default();
        config
            .apply_overrides(&[
                "parallelism=3".to_string(),
                "list_timeout=10".to_string(),
                "test_suites.net.host=example.org".to_string(),
            ])
            .unwrap();

        assert_eq!(config.parallelism, 3);
        assert_eq!(config.list_timeout, Duration::from_secs(10));
        assert_eq!(
            config.test_suite_vars("net").get("host").map(String::as_str),
            Some("example.org")
        );
        assert_eq!(config.source_of("parallelism"), ConfigSource::Cli);
        assert_eq!(config.source_of("platform"), ConfigSource::Defaults);
    }

    #[test]
    fn test_overrides_reject_bad_input() {
        let mut config = Config::default();
        assert!(matches!(
            config.apply_overrides(&["colour=blue".to_string()]),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            config.apply_overrides(&["parallelism=many".to_string()]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.apply_overrides(&["test_suites.only_suite=1".to_string()]),
            Err(ConfigError::UnknownKey(_))
        ));
    }
}
