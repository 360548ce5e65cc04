use std::collections::BTreeMap;
use std::time::Duration;

use crate::model::Config;

fn seconds(duration: Duration) -> String {
    duration.as_secs().to_string()
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            let source = self.source_of(key).to_string();
            config.insert(key.to_string(), (value, source));
        };

        add("architecture", self.architecture.clone());
        add("platform", self.platform.clone());
        add("parallelism", self.parallelism.to_string());
        add(
            "unprivileged_user",
            self.unprivileged_user.clone().unwrap_or_default(),
        );
        add("list_timeout", seconds(self.list_timeout));
        add("cleanup_timeout", seconds(self.cleanup_timeout));
        add("work_root", self.work_root.display().to_string());
        add("store_dir", self.store_dir.display().to_string());

        for (suite, vars) in &self.test_suites {
            for (var, value) in vars {
                add(&format!("test_suites.{suite}.{var}"), value.clone());
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConfigSource;

    #[test]
    fn test_effective_config_lists_every_key() {
        let mut config = Config::default();
        config
            .set_value("test_suites.s.v", "x", ConfigSource::Cli)
            .unwrap();

        let effective = config.effective_config();
        assert_eq!(
            effective.get("parallelism"),
            Some(&("1".to_string(), "defaults".to_string()))
        );
        assert_eq!(
            effective.get("test_suites.s.v"),
            Some(&("x".to_string(), "CLI".to_string()))
        );
        assert_eq!(
            effective.get("list_timeout").map(|(v, _)| v.as_str()),
            Some("300")
        );
    }
}
