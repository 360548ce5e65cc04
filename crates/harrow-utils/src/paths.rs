//! Path resolution for harrow's per-user state.
//!
//! The home directory holds the results store and is resolved as:
//! thread-local test override > `HARROW_HOME` > `~/.harrow` > `./.harrow`.

use camino::Utf8PathBuf;
use std::cell::RefCell;
use std::path::{Component, Path, PathBuf};

// Thread-local override used only in tests to avoid process-global env races.
thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

/// Name of the environment variable overriding the home directory.
pub const HOME_ENV_VAR: &str = "HARROW_HOME";

/// Returns the harrow home directory.
#[must_use]
pub fn harrow_home() -> Utf8PathBuf {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return tl;
    }
    if let Ok(p) = std::env::var(HOME_ENV_VAR) {
        return Utf8PathBuf::from(p);
    }
    dirs::home_dir()
        .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
        .map_or_else(|| Utf8PathBuf::from(".harrow"), |home| home.join(".harrow"))
}

/// Returns `<HARROW_HOME>/store`
#[must_use]
pub fn store_dir() -> Utf8PathBuf {
    harrow_home().join("store")
}

/// mkdir -p; treat `AlreadyExists` as success (removes TOCTTOU races)
pub fn ensure_dir_all<P: AsRef<Path>>(p: P) -> std::io::Result<()> {
    match std::fs::create_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Lexically normalize a relative path: drops `.` components and empty
/// segments. Returns `None` for absolute paths and for paths that climb
/// with `..`, which never name something inside a suite root.
#[must_use]
pub fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if normalized.as_os_str().is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// RAII guard for isolated home that clears thread-local state on drop
#[cfg(any(test, feature = "test-utils"))]
pub struct HomeGuard {
    inner: tempfile::TempDir,
}

#[cfg(any(test, feature = "test-utils"))]
impl Drop for HomeGuard {
    fn drop(&mut self) {
        THREAD_HOME.with(|tl| *tl.borrow_mut() = None);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl std::ops::Deref for HomeGuard {
    type Target = tempfile::TempDir;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Test helper: points [`harrow_home`] at a fresh temporary directory for the
/// current thread.
#[cfg(any(test, feature = "test-utils"))]
#[must_use]
pub fn with_isolated_home() -> HomeGuard {
    let td = tempfile::TempDir::new().expect("create temp home");
    let p = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("utf-8 temp path");
    THREAD_HOME.with(|tl| *tl.borrow_mut() = Some(p));
    HomeGuard { inner: td }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_home_overrides_store_dir() {
        let home = with_isolated_home();
        let expected = Utf8PathBuf::from_path_buf(home.path().join("store")).unwrap();
        assert_eq!(store_dir(), expected);
    }

    #[test]
    fn test_isolated_home_is_cleared_on_drop() {
        let path = {
            let home = with_isolated_home();
            home.path().to_path_buf()
        };
        assert_ne!(harrow_home().as_std_path(), path.as_path());
    }

    #[test]
    fn test_ensure_dir_all_is_idempotent() {
        let td = tempfile::TempDir::new().unwrap();
        let nested = td.path().join("a/b/c");
        ensure_dir_all(&nested).unwrap();
        ensure_dir_all(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_normalize_relative() {
        assert_eq!(
            normalize_relative(Path::new("./a//b/./c")),
            Some(PathBuf::from("a/b/c"))
        );
        assert_eq!(normalize_relative(Path::new("/abs")), None);
        assert_eq!(normalize_relative(Path::new("a/../b")), None);
        assert_eq!(normalize_relative(Path::new(".")), None);
        assert_eq!(normalize_relative(Path::new("")), None);
    }
}
