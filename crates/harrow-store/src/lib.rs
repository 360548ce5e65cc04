//! SQLite store for the results of test runs.
//!
//! A results file is written once, through a single [`WriteTransaction`],
//! and later read back with [`Store::context`] and [`Store::results`].
//! Stored programs, cases and results reconstruct to values equal to the
//! ones that were written.

pub mod error;
pub mod layout;
mod read;
mod schema;
mod write;

use std::path::{Path, PathBuf};

use harrow_model::Context;
use rusqlite::{Connection, OpenFlags};

pub use error::StoreError;
pub use layout::{find_latest, new_results_file};
pub use read::ResultRecord;
pub use schema::SCHEMA_VERSION;
pub use write::{CaseId, ProgramId, WriteTransaction};

/// Name under which captured stdout is attached to a case.
pub const STDOUT_FILE: &str = "__STDOUT__";

/// Name under which captured stderr is attached to a case.
pub const STDERR_FILE: &str = "__STDERR__";

/// An open results file.
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Create a new results file at `path`, which must not exist yet.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            return Err(StoreError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            harrow_utils::paths::ensure_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize(&mut conn)?;

        tracing::info!(path = %path.display(), "created results file");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing results file for reading.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.is_file() {
            return Err(StoreError::Open {
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        schema::check_version(&conn)?;

        tracing::debug!(path = %path.display(), "opened results file");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start the write transaction of a run.
    pub fn begin_write(&mut self) -> Result<WriteTransaction<'_>, StoreError> {
        Ok(WriteTransaction::new(self.conn.transaction()?))
    }

    /// The context recorded for the run.
    pub fn context(&self) -> Result<Context, StoreError> {
        read::load_context(&self.conn)
    }

    /// Every stored result ordered by program path, then case name.
    pub fn results(&self) -> Result<Vec<ResultRecord>, StoreError> {
        read::load_results(&self.conn)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish_non_exhaustive()
    }
}
