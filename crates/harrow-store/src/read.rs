use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use harrow_model::{
    Context, Metadata, MetadataBuilder, TestCase, TestCasesMap, TestProgram, TestResult,
    TestResultType,
};
use rusqlite::{Connection, params};

use crate::error::StoreError;

/// One stored result together with everything needed to interpret it.
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub program: Arc<TestProgram>,
    pub case_name: String,
    pub result: TestResult,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ResultRecord {
    /// `end_time - start_time`, never negative.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        (self.end_time - self.start_time)
            .to_std()
            .unwrap_or_default()
    }
}

pub(crate) fn load_context(conn: &Connection) -> Result<Context, StoreError> {
    let cwd: String = conn
        .query_row("SELECT cwd FROM contexts LIMIT 1", [], |row| row.get(0))
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::integrity("no context stored"),
            other => StoreError::from(other),
        })?;

    let mut stmt = conn.prepare("SELECT var_name, var_value FROM env_vars")?;
    let env = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<BTreeMap<String, String>, _>>()?;
    Ok(Context::new(PathBuf::from(cwd), env))
}

fn load_metadata(conn: &Connection, metadata_id: i64) -> Result<Metadata, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT property_name, property_value FROM metadatas WHERE metadata_id = ?1",
    )?;
    let properties = stmt
        .query_map(params![metadata_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut builder = MetadataBuilder::new();
    builder.set_all(properties.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    Ok(builder.build())
}

fn parse_result(kind: &str, reason: String) -> Result<TestResult, StoreError> {
    Ok(TestResult::new(TestResultType::parse(kind)?, reason))
}

fn micros_to_time(micros: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::integrity(format!("timestamp {micros} out of range")))
}

fn load_cases(conn: &Connection, program_id: i64) -> Result<TestCasesMap, StoreError> {
    struct Row {
        name: String,
        metadata_id: i64,
        fake_type: Option<String>,
        fake_reason: Option<String>,
    }

    let mut stmt = conn.prepare(
        "SELECT name, metadata_id, fake_result_type, fake_result_reason
         FROM test_cases WHERE test_program_id = ?1",
    )?;
    let rows = stmt
        .query_map(params![program_id], |row| {
            Ok(Row {
                name: row.get(0)?,
                metadata_id: row.get(1)?,
                fake_type: row.get(2)?,
                fake_reason: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut cases = TestCasesMap::new();
    for row in rows {
        let metadata = load_metadata(conn, row.metadata_id)?;
        let case = match row.fake_type {
            Some(kind) => TestCase::fake(
                &row.name,
                metadata,
                parse_result(&kind, row.fake_reason.unwrap_or_default())?,
            ),
            None => TestCase::new(&row.name, metadata),
        };
        cases.insert(row.name, case);
    }
    Ok(cases)
}

fn load_programs(conn: &Connection) -> Result<HashMap<i64, Arc<TestProgram>>, StoreError> {
    struct Row {
        id: i64,
        root: String,
        relative_path: String,
        test_suite_name: String,
        metadata_id: i64,
        interface: String,
    }

    let mut stmt = conn.prepare(
        "SELECT test_program_id, root, relative_path, test_suite_name, metadata_id, interface
         FROM test_programs",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Row {
                id: row.get(0)?,
                root: row.get(1)?,
                relative_path: row.get(2)?,
                test_suite_name: row.get(3)?,
                metadata_id: row.get(4)?,
                interface: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut programs = HashMap::new();
    for row in rows {
        let program = TestProgram::new(
            row.interface,
            row.relative_path,
            row.root,
            row.test_suite_name,
            load_metadata(conn, row.metadata_id)?,
            load_cases(conn, row.id)?,
        );
        programs.insert(row.id, Arc::new(program));
    }
    Ok(programs)
}

fn load_files(conn: &Connection, case_id: i64) -> Result<HashMap<String, Vec<u8>>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT test_case_files.file_name, files.contents
         FROM test_case_files JOIN files ON test_case_files.file_id = files.file_id
         WHERE test_case_files.test_case_id = ?1",
    )?;
    let files = stmt
        .query_map(params![case_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<HashMap<String, Vec<u8>>, _>>()?;
    Ok(files)
}

/// Every stored result, ordered by program path and then case name.
pub(crate) fn load_results(conn: &Connection) -> Result<Vec<ResultRecord>, StoreError> {
    struct Row {
        program_id: i64,
        case_id: i64,
        case_name: String,
        kind: String,
        reason: String,
        start: i64,
        end: i64,
    }

    let programs = load_programs(conn)?;

    let mut stmt = conn.prepare(
        "SELECT test_cases.test_program_id, test_cases.test_case_id, test_cases.name,
                test_results.result_type, test_results.result_reason,
                test_results.start_time, test_results.end_time
         FROM test_results
         JOIN test_cases ON test_results.test_case_id = test_cases.test_case_id
         JOIN test_programs ON test_cases.test_program_id = test_programs.test_program_id
         ORDER BY test_programs.absolute_path, test_cases.name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Row {
                program_id: row.get(0)?,
                case_id: row.get(1)?,
                case_name: row.get(2)?,
                kind: row.get(3)?,
                reason: row.get(4)?,
                start: row.get(5)?,
                end: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let program = programs.get(&row.program_id).cloned().ok_or_else(|| {
            StoreError::integrity(format!("result refers to unknown program {}", row.program_id))
        })?;
        let mut files = load_files(conn, row.case_id)?;
        records.push(ResultRecord {
            program,
            result: parse_result(&row.kind, row.reason)?,
            start_time: micros_to_time(row.start)?,
            end_time: micros_to_time(row.end)?,
            stdout: files.remove(crate::STDOUT_FILE).unwrap_or_default(),
            stderr: files.remove(crate::STDERR_FILE).unwrap_or_default(),
            case_name: row.case_name,
        });
    }
    Ok(records)
}
