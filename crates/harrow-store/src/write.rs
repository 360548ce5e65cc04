use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use harrow_model::{Context, Metadata, TestCase, TestProgram, TestResult};
use rusqlite::{Transaction, params};

use crate::error::StoreError;

/// Row id of a stored test program.
pub type ProgramId = i64;

/// Row id of a stored test case.
pub type CaseId = i64;

/// A single write transaction over a results file.
///
/// Nothing is visible to readers until [`commit`](Self::commit) runs;
/// dropping the transaction rolls everything back.
pub struct WriteTransaction<'a> {
    tx: Transaction<'a>,
    programs: HashMap<PathBuf, ProgramId>,
}

impl<'a> WriteTransaction<'a> {
    pub(crate) fn new(tx: Transaction<'a>) -> Self {
        Self {
            tx,
            programs: HashMap::new(),
        }
    }

    /// Record the working directory and environment of the run.
    pub fn put_context(&mut self, context: &Context) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT INTO contexts (cwd) VALUES (?1)",
            params![path_text(&context.cwd)?],
        )?;
        let mut stmt = self
            .tx
            .prepare("INSERT OR REPLACE INTO env_vars (var_name, var_value) VALUES (?1, ?2)")?;
        for (name, value) in &context.env {
            stmt.execute(params![name, value])?;
        }
        Ok(())
    }

    fn put_metadata(&mut self, metadata: &Metadata) -> Result<i64, StoreError> {
        let id: i64 = self.tx.query_row(
            "SELECT COALESCE(MAX(metadata_id), 0) + 1 FROM metadatas",
            [],
            |row| row.get(0),
        )?;
        let mut stmt = self.tx.prepare(
            "INSERT INTO metadatas (metadata_id, property_name, property_value)
             VALUES (?1, ?2, ?3)",
        )?;
        for (name, value) in metadata.to_properties() {
            stmt.execute(params![id, name, value])?;
        }
        Ok(id)
    }

    /// Store `program` once per transaction; later calls return the same id.
    pub fn put_test_program(&mut self, program: &TestProgram) -> Result<ProgramId, StoreError> {
        let absolute = program.absolute_path();
        if let Some(id) = self.programs.get(&absolute) {
            return Ok(*id);
        }

        let metadata_id = self.put_metadata(program.metadata())?;
        self.tx.execute(
            "INSERT INTO test_programs
                 (absolute_path, root, relative_path, test_suite_name, metadata_id, interface)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                path_text(&absolute)?,
                path_text(program.root())?,
                path_text(program.relative_path())?,
                program.test_suite_name(),
                metadata_id,
                program.interface_name(),
            ],
        )?;
        let id = self.tx.last_insert_rowid();
        tracing::trace!(program = %absolute.display(), id, "stored test program");
        self.programs.insert(absolute, id);
        Ok(id)
    }

    pub fn put_test_case(
        &mut self,
        program_id: ProgramId,
        case: &TestCase,
    ) -> Result<CaseId, StoreError> {
        let metadata_id = self.put_metadata(case.metadata())?;
        let (fake_type, fake_reason) = match case.fake_result() {
            Some(result) => (Some(result.kind().to_string()), Some(result.reason())),
            None => (None, None),
        };
        self.tx.execute(
            "INSERT INTO test_cases
                 (test_program_id, name, metadata_id, fake_result_type, fake_result_reason)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![program_id, case.name(), metadata_id, fake_type, fake_reason],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn put_result(
        &mut self,
        case_id: CaseId,
        result: &TestResult,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT INTO test_results
                 (test_case_id, result_type, result_reason, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                case_id,
                result.kind().to_string(),
                result.reason(),
                start_time.timestamp_micros(),
                end_time.timestamp_micros(),
            ],
        )?;
        Ok(())
    }

    /// Attach the contents of `path` to a case as `name`.
    ///
    /// Missing and empty files are not stored.
    pub fn put_test_case_file(
        &mut self,
        case_id: CaseId,
        name: &str,
        path: &Path,
    ) -> Result<(), StoreError> {
        let contents = match std::fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if contents.is_empty() {
            return Ok(());
        }

        self.tx
            .execute("INSERT INTO files (contents) VALUES (?1)", params![contents])?;
        let file_id = self.tx.last_insert_rowid();
        self.tx.execute(
            "INSERT INTO test_case_files (test_case_id, file_name, file_id) VALUES (?1, ?2, ?3)",
            params![case_id, name, file_id],
        )?;
        Ok(())
    }

    pub fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }
}

/// Paths are stored as TEXT, so anything that would not read back
/// byte-for-byte is refused.
pub(crate) fn path_text(path: &Path) -> Result<&str, StoreError> {
    path.to_str().ok_or_else(|| StoreError::NonUtf8Path {
        path: path.to_path_buf(),
    })
}
