//! Naming of results files inside the store directory.
//!
//! Each run writes `results.<escaped-root>.<YYYYMMDD-HHMMSS-uuuuuu>.db`,
//! where the escaped root is the suite root with its leading separator
//! dropped and every other separator turned into `_`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::StoreError;

const PREFIX: &str = "results.";
const SUFFIX: &str = ".db";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S-%6f";
const TIMESTAMP_SHAPE: &str = "dddddddd-dddddd-dddddd";

/// Flatten `root` into a single file name component.
#[must_use]
pub fn escape_root(root: &Path) -> String {
    let text = root.to_string_lossy();
    let trimmed = text.trim_start_matches('/');
    if trimmed.is_empty() {
        "ROOT".to_string()
    } else {
        trimmed.replace('/', "_")
    }
}

/// File name of the results of a run of `root` started at `when`.
#[must_use]
pub fn results_file_name(root: &Path, when: DateTime<Utc>) -> String {
    format!(
        "{PREFIX}{}.{}{SUFFIX}",
        escape_root(root),
        when.format(TIMESTAMP_FORMAT)
    )
}

/// Path for a new results file of `root` in `store_dir`.
#[must_use]
pub fn new_results_file(store_dir: &Path, root: &Path) -> PathBuf {
    store_dir.join(results_file_name(root, Utc::now()))
}

fn is_timestamp(text: &str) -> bool {
    text.len() == TIMESTAMP_SHAPE.len()
        && text.chars().zip(TIMESTAMP_SHAPE.chars()).all(|(c, shape)| match shape {
            'd' => c.is_ascii_digit(),
            _ => c == shape,
        })
}

/// The most recent results file of `root` in `store_dir`.
pub fn find_latest(store_dir: &Path, root: &Path) -> Result<PathBuf, StoreError> {
    let not_found = || StoreError::NoResultsFile {
        root: root.to_path_buf(),
    };
    let prefix = format!("{PREFIX}{}.", escape_root(root));

    let entries = match std::fs::read_dir(store_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(source) => {
            return Err(StoreError::Io {
                path: store_dir.to_path_buf(),
                source,
            });
        }
    };

    let latest = entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            name.strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(SUFFIX))
                .is_some_and(is_timestamp)
        })
        .max();

    tracing::debug!(store = %store_dir.display(), latest = ?latest, "looked up latest results file");
    latest.map(|name| store_dir.join(name)).ok_or_else(not_found)
}
