//! On-disk schema of a results file.

use chrono::Utc;
use rusqlite::{Connection, params};

use crate::error::StoreError;

/// Version written into new files and required when opening old ones.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE metadata (
    schema_version INTEGER PRIMARY KEY CHECK (schema_version >= 1),
    timestamp INTEGER NOT NULL
);

CREATE TABLE contexts (
    cwd TEXT NOT NULL
);

CREATE TABLE env_vars (
    var_name TEXT PRIMARY KEY,
    var_value TEXT NOT NULL
);

CREATE TABLE metadatas (
    metadata_id INTEGER NOT NULL,
    property_name TEXT NOT NULL,
    property_value TEXT NOT NULL,
    PRIMARY KEY (metadata_id, property_name)
);

CREATE TABLE test_programs (
    test_program_id INTEGER PRIMARY KEY AUTOINCREMENT,
    absolute_path TEXT NOT NULL UNIQUE,
    root TEXT NOT NULL,
    relative_path TEXT NOT NULL,
    test_suite_name TEXT NOT NULL,
    metadata_id INTEGER NOT NULL,
    interface TEXT NOT NULL
);

CREATE TABLE test_cases (
    test_case_id INTEGER PRIMARY KEY AUTOINCREMENT,
    test_program_id INTEGER NOT NULL REFERENCES test_programs,
    name TEXT NOT NULL,
    metadata_id INTEGER NOT NULL,
    fake_result_type TEXT,
    fake_result_reason TEXT,
    UNIQUE (test_program_id, name)
);

CREATE TABLE test_results (
    test_case_id INTEGER PRIMARY KEY REFERENCES test_cases,
    result_type TEXT NOT NULL,
    result_reason TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    end_time INTEGER NOT NULL
);

CREATE TABLE files (
    file_id INTEGER PRIMARY KEY AUTOINCREMENT,
    contents BLOB NOT NULL
);

CREATE TABLE test_case_files (
    test_case_id INTEGER NOT NULL REFERENCES test_cases,
    file_name TEXT NOT NULL,
    file_id INTEGER NOT NULL REFERENCES files,
    PRIMARY KEY (test_case_id, file_name)
);

CREATE INDEX index_test_cases_by_program ON test_cases (test_program_id);
";

/// Create every table of a fresh results file and stamp its version.
pub(crate) fn initialize(conn: &mut Connection) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)?;
    tx.execute(
        "INSERT INTO metadata (schema_version, timestamp) VALUES (?1, ?2)",
        params![SCHEMA_VERSION, Utc::now().timestamp()],
    )?;
    tx.commit()?;
    Ok(())
}

/// Fail unless the file was written with [`SCHEMA_VERSION`].
pub(crate) fn check_version(conn: &Connection) -> Result<(), StoreError> {
    let found: Option<i64> = conn
        .query_row("SELECT MAX(schema_version) FROM metadata", [], |row| {
            row.get(0)
        })
        .map_err(|e| StoreError::integrity(format!("missing schema metadata: {e}")))?;
    match found {
        Some(SCHEMA_VERSION) => Ok(()),
        Some(found) => Err(StoreError::SchemaVersion {
            found,
            expected: SCHEMA_VERSION,
        }),
        None => Err(StoreError::integrity("schema version not recorded")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_records_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize(&mut conn).unwrap();
        check_version(&conn).unwrap();
    }

    #[test]
    fn test_rejects_other_versions() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize(&mut conn).unwrap();
        conn.execute("UPDATE metadata SET schema_version = 7", [])
            .unwrap();
        assert!(matches!(
            check_version(&conn),
            Err(StoreError::SchemaVersion { found: 7, expected: 1 })
        ));
    }

    #[test]
    fn test_rejects_foreign_database() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE unrelated (x INTEGER)").unwrap();
        assert!(matches!(
            check_version(&conn),
            Err(StoreError::Integrity(_))
        ));
    }
}
