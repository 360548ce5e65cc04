use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for listing the test cases of one program.
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(300);

/// Default timeout for one cleanup step.
pub const DEFAULT_CLEANUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    ConfigFile(PathBuf),
    Programmatic,
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::ConfigFile(path) => write!(f, "config file ({})", path.display()),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

/// Configuration inputs collected by the command line.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit configuration file; disables discovery.
    pub config_path: Option<PathBuf>,
    /// Raw `key=value` overrides in command-line order.
    pub overrides: Vec<String>,
}

/// Effective configuration of one harrow invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Machine architecture test cases may restrict themselves to.
    pub architecture: String,
    /// Platform name test cases may restrict themselves to.
    pub platform: String,
    /// Maximum number of test cases running at once.
    pub parallelism: usize,
    /// Account used to satisfy `required_user = unprivileged` when running as root.
    pub unprivileged_user: Option<String>,
    pub list_timeout: Duration,
    pub cleanup_timeout: Duration,
    /// Directory under which scheduler work roots are created.
    pub work_root: PathBuf,
    /// Directory holding result databases.
    pub store_dir: PathBuf,
    /// Per-suite variables exported to test programs.
    pub test_suites: BTreeMap<String, BTreeMap<String, String>>,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        let mut source_attribution = HashMap::new();
        for key in crate::overrides::SCALAR_KEYS {
            source_attribution.insert((*key).to_string(), ConfigSource::Defaults);
        }

        Self {
            architecture: std::env::consts::ARCH.to_string(),
            platform: std::env::consts::OS.to_string(),
            parallelism: 1,
            unprivileged_user: None,
            list_timeout: DEFAULT_LIST_TIMEOUT,
            cleanup_timeout: DEFAULT_CLEANUP_TIMEOUT,
            work_root: std::env::temp_dir(),
            store_dir: harrow_utils::paths::store_dir().into_std_path_buf(),
            test_suites: BTreeMap::new(),
            source_attribution,
        }
    }
}

impl Config {
    /// Variables of `suite`, empty when the suite has none.
    #[must_use]
    pub fn test_suite_vars(&self, suite: &str) -> BTreeMap<String, String> {
        self.test_suites.get(suite).cloned().unwrap_or_default()
    }

    /// Whether `test_suites.<suite>.<var>` is defined.
    #[must_use]
    pub fn has_test_suite_var(&self, suite: &str, var: &str) -> bool {
        self.test_suites
            .get(suite)
            .is_some_and(|vars| vars.contains_key(var))
    }

    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .cloned()
            .unwrap_or(ConfigSource::Defaults)
    }
}
