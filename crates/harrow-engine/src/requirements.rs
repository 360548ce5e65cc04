//! Checks run before a test case is spawned.
//!
//! A case whose requirements are not met is reported as skipped with the
//! reason returned here and never reaches a child process.

use std::path::Path;

use harrow_config::Config;
use harrow_model::{Metadata, RequiredUser};
use harrow_utils::units::Bytes;

/// Configuration variable names that refer to the global unprivileged user.
const UNPRIVILEGED_USER_VARS: &[&str] = &["unprivileged_user", "unprivileged-user"];

/// Reason `metadata` cannot run under `config`, or `None` when it can.
#[must_use]
pub fn check_requirements(
    metadata: &Metadata,
    config: &Config,
    test_suite: &str,
    work_directory: &Path,
) -> Option<String> {
    check_configs(metadata, config, test_suite)
        .or_else(|| check_allowed("architecture", &metadata.allowed_architectures, &config.architecture))
        .or_else(|| check_allowed("platform", &metadata.allowed_platforms, &config.platform))
        .or_else(|| check_user(metadata.required_user, config))
        .or_else(|| check_files(metadata))
        .or_else(|| check_programs(metadata))
        .or_else(|| check_memory(metadata.required_memory))
        .or_else(|| check_disk_space(metadata.required_disk_space, work_directory))
}

fn check_configs(metadata: &Metadata, config: &Config, test_suite: &str) -> Option<String> {
    metadata.required_configs.iter().find_map(|name| {
        let defined = if UNPRIVILEGED_USER_VARS.contains(&name.as_str()) {
            config.unprivileged_user.is_some()
        } else {
            config.has_test_suite_var(test_suite, name)
        };
        (!defined).then(|| format!("Required configuration property '{name}' not defined"))
    })
}

fn check_allowed(
    what: &str,
    allowed: &std::collections::BTreeSet<String>,
    current: &str,
) -> Option<String> {
    if allowed.is_empty() || allowed.contains(current) {
        return None;
    }
    Some(format!("Current {what} '{current}' not supported"))
}

#[cfg(unix)]
fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

fn check_user(required: RequiredUser, config: &Config) -> Option<String> {
    match required {
        RequiredUser::Any => None,
        RequiredUser::Root if running_as_root() => None,
        RequiredUser::Root => Some("Requires root privileges".to_string()),
        RequiredUser::Unprivileged if !running_as_root() => None,
        RequiredUser::Unprivileged if config.unprivileged_user.is_some() => None,
        RequiredUser::Unprivileged => Some(
            "Requires an unprivileged user but the unprivileged_user configuration variable is not defined"
                .to_string(),
        ),
    }
}

fn check_files(metadata: &Metadata) -> Option<String> {
    metadata
        .required_files
        .iter()
        .find(|file| !file.exists())
        .map(|file| format!("Required file '{}' not found", file.display()))
}

fn check_programs(metadata: &Metadata) -> Option<String> {
    metadata.required_programs.iter().find_map(|program| {
        if program.is_absolute() {
            return (!program.exists())
                .then(|| format!("Required program '{}' not found", program.display()));
        }
        which::which(program)
            .is_err()
            .then(|| format!("Required program '{}' not found in PATH", program.display()))
    })
}

fn check_memory(required: Bytes) -> Option<String> {
    if required.as_u64() == 0 {
        return None;
    }
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    let available = system.total_memory();
    if available == 0 {
        tracing::debug!("cannot determine physical memory; assuming the requirement is met");
        return None;
    }
    (available < required.as_u64()).then(|| {
        format!(
            "Requires {} bytes of physical memory but only {available} available",
            required.as_u64()
        )
    })
}

fn check_disk_space(required: Bytes, work_directory: &Path) -> Option<String> {
    if required.as_u64() == 0 {
        return None;
    }
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|disk| work_directory.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().components().count());
    let Some(disk) = disk else {
        tracing::debug!(dir = %work_directory.display(), "cannot find the file system of the work directory");
        return None;
    };
    let available = disk.available_space();
    (available < required.as_u64()).then(|| {
        format!(
            "Requires {} bytes of free disk space but only {available} available",
            required.as_u64()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use harrow_model::MetadataBuilder;

    fn metadata(props: &[(&str, &str)]) -> Metadata {
        let mut builder = MetadataBuilder::new();
        for (name, value) in props {
            builder.set(name, value).unwrap();
        }
        builder.build()
    }

    fn config() -> Config {
        Config::builder()
            .architecture("amd64")
            .platform("linux")
            .test_suite_var("suite", "host", "db1")
            .build()
            .unwrap()
    }

    fn check(props: &[(&str, &str)]) -> Option<String> {
        check_requirements(&metadata(props), &config(), "suite", Path::new("/"))
    }

    #[test]
    fn test_no_requirements() {
        assert_eq!(check(&[]), None);
    }

    #[test]
    fn test_architecture_and_platform() {
        assert_eq!(check(&[("allowed_architectures", "amd64 arm64")]), None);
        assert_eq!(
            check(&[("allowed_architectures", "sparc64")]),
            Some("Current architecture 'amd64' not supported".to_string())
        );
        assert_eq!(
            check(&[("allowed_platforms", "netbsd")]),
            Some("Current platform 'linux' not supported".to_string())
        );
    }

    #[test]
    fn test_required_configs() {
        assert_eq!(check(&[("required_configs", "host")]), None);
        assert_eq!(
            check(&[("required_configs", "host port")]),
            Some("Required configuration property 'port' not defined".to_string())
        );
    }

    #[test]
    fn test_required_files_and_programs() {
        assert_eq!(
            check(&[("required_files", "/nonexistent/harrow/file")]),
            Some("Required file '/nonexistent/harrow/file' not found".to_string())
        );
        assert_eq!(
            check(&[("required_programs", "/nonexistent/harrow/prog")]),
            Some("Required program '/nonexistent/harrow/prog' not found".to_string())
        );
        assert_eq!(
            check(&[("required_programs", "harrow-no-such-program-anywhere")]),
            Some("Required program 'harrow-no-such-program-anywhere' not found in PATH".to_string())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_programs_pass() {
        assert_eq!(check(&[("required_programs", "/bin/sh sh")]), None);
    }

    #[test]
    fn test_absurd_memory_requirement() {
        let reason = check(&[("required_memory", "1000000T")]);
        if let Some(reason) = reason {
            assert!(reason.starts_with("Requires"));
        }
    }

    #[test]
    fn test_first_failure_wins() {
        let reason = check(&[
            ("required_configs", "missing"),
            ("allowed_platforms", "netbsd"),
        ]);
        assert_eq!(
            reason,
            Some("Required configuration property 'missing' not defined".to_string())
        );
    }
}
