use super::{Store, StoreAdapter};
use crate::error::StoreError;
use crate::types::{CommitRecord, Labels, RECORD_ATTRIBUTES, RECORD_SCHEMA_VERSION};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-database metadata table
const META_TABLE: &str = "store_meta";

fn column_type(attribute: &str) -> &'static str {
    match attribute {
        "author_unix_timestamp" | "committer_unix_timestamp" => "REAL",
        "len_subject" => "INTEGER",
        a if a.starts_with("num_") => "INTEGER",
        _ => "TEXT",
    }
}

/// Store kept as one table of a SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    table: String,
}

impl SqliteStore {
    /// `table` must be a plain identifier; configuration validation enforces this
    pub fn new(path: impl Into<PathBuf>, table: &str) -> Self {
        Self {
            path: path.into(),
            table: table.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, String> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let conn = Connection::open(&self.path).map_err(|e| e.to_string())?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| e.to_string())?;
        Ok(conn)
    }

    fn create_table_sql(&self) -> String {
        let columns: Vec<String> = RECORD_ATTRIBUTES
            .iter()
            .map(|attr| format!("    {} {} NOT NULL", attr, column_type(attr)))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n{}\n);",
            self.table,
            columns.join(",\n")
        )
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM \"{}\" ORDER BY rowid",
            RECORD_ATTRIBUTES.join(", "),
            self.table
        )
    }

    fn insert_sql(&self) -> String {
        let placeholders: Vec<String> = (1..=RECORD_ATTRIBUTES.len())
            .map(|i| format!("?{}", i))
            .collect();
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.table,
            RECORD_ATTRIBUTES.join(", "),
            placeholders.join(", ")
        )
    }

    /// Create the metadata and record tables if missing, then check both
    fn prepare_schema(&self, conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, value TEXT NOT NULL);\n{}",
            META_TABLE,
            self.create_table_sql()
        ))
        .map_err(|e| self.load_error(e))?;

        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (key, value) VALUES ('schema_version', ?1)",
                META_TABLE
            ),
            params![RECORD_SCHEMA_VERSION.to_string()],
        )
        .map_err(|e| self.load_error(e))?;

        let version: String = conn
            .query_row(
                &format!("SELECT value FROM {} WHERE key = 'schema_version'", META_TABLE),
                [],
                |row| row.get(0),
            )
            .map_err(|e| self.load_error(e))?;
        if version != RECORD_SCHEMA_VERSION.to_string() {
            return Err(self.mismatch(format!(
                "schema version {} (expected {})",
                version, RECORD_SCHEMA_VERSION
            )));
        }

        let columns = self.table_columns(conn).map_err(|e| self.load_error(e))?;
        let missing: Vec<&str> = RECORD_ATTRIBUTES
            .iter()
            .copied()
            .filter(|attr| !columns.iter().any(|c| c == attr))
            .collect();
        if !missing.is_empty() {
            return Err(self.mismatch(format!(
                "table '{}' lacks columns: {}",
                self.table,
                missing.join(", ")
            )));
        }

        Ok(())
    }

    fn table_columns(&self, conn: &Connection) -> rusqlite::Result<Vec<String>> {
        let mut table_info = conn.prepare(&format!("PRAGMA table_info(\"{}\")", self.table))?;
        let rows = table_info.query_map([], |row| row.get::<_, String>(1))?;
        rows.collect()
    }

    fn load_error(&self, reason: impl std::fmt::Display) -> StoreError {
        StoreError::LoadFailed {
            location: self.location(),
            reason: reason.to_string(),
        }
    }

    fn save_error(&self, reason: impl std::fmt::Display) -> StoreError {
        StoreError::SaveFailed {
            location: self.location(),
            reason: reason.to_string(),
        }
    }

    fn mismatch(&self, reason: impl std::fmt::Display) -> StoreError {
        StoreError::SchemaMismatch {
            location: self.location(),
            reason: reason.to_string(),
        }
    }

    fn write_rows(&self, conn: &mut Connection, store: &Store) -> rusqlite::Result<()> {
        let tx = conn.transaction()?;
        tx.execute(&format!("DELETE FROM \"{}\"", self.table), [])?;
        {
            let mut stmt = tx.prepare(&self.insert_sql())?;
            for record in store.records() {
                let labels = serde_json::to_string(&record.labels)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                stmt.execute(params![
                    record.repo_remote_hostname,
                    record.repo_owner,
                    record.repo_name,
                    record.path_in_repo,
                    labels,
                    record.commit_hash,
                    record.author_name,
                    record.author_email,
                    record.author_unix_timestamp,
                    record.committer_name,
                    record.committer_email,
                    record.committer_unix_timestamp,
                    record.subject,
                    to_sql_count(record.len_subject)?,
                    to_sql_count(record.num_files_changed)?,
                    to_sql_count(record.num_lines_changed)?,
                    to_sql_count(record.num_lines_inserted)?,
                    to_sql_count(record.num_lines_deleted)?,
                    to_sql_count(record.num_lines_modified)?,
                ])?;
            }
        }
        tx.commit()
    }
}

fn to_sql_count(value: u64) -> rusqlite::Result<i64> {
    i64::try_from(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn count_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

fn labels_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Labels> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Columns arrive in `RECORD_ATTRIBUTES` order
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<CommitRecord> {
    Ok(CommitRecord {
        repo_remote_hostname: row.get(0)?,
        repo_owner: row.get(1)?,
        repo_name: row.get(2)?,
        path_in_repo: row.get(3)?,
        labels: labels_column(row, 4)?,
        commit_hash: row.get(5)?,
        author_name: row.get(6)?,
        author_email: row.get(7)?,
        author_unix_timestamp: row.get(8)?,
        committer_name: row.get(9)?,
        committer_email: row.get(10)?,
        committer_unix_timestamp: row.get(11)?,
        subject: row.get(12)?,
        len_subject: count_column(row, 13)?,
        num_files_changed: count_column(row, 14)?,
        num_lines_changed: count_column(row, 15)?,
        num_lines_inserted: count_column(row, 16)?,
        num_lines_deleted: count_column(row, 17)?,
        num_lines_modified: count_column(row, 18)?,
    })
}

/// Row-level conversion failures mean the table holds data of the wrong shape
fn is_shape_error(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
    )
}

impl StoreAdapter for SqliteStore {
    fn load(&self) -> Result<Store, StoreError> {
        let conn = self.open().map_err(|e| self.load_error(e))?;
        self.prepare_schema(&conn)?;

        let mut stmt = conn
            .prepare(&self.select_sql())
            .map_err(|e| self.load_error(e))?;
        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| self.load_error(e))?;

        let mut records = Vec::new();
        for row in rows {
            match row {
                Ok(record) => records.push(record),
                Err(e) if is_shape_error(&e) => return Err(self.mismatch(e)),
                Err(e) => return Err(self.load_error(e)),
            }
        }

        tracing::info!(
            "Loaded {} commit records from {:?} table '{}'",
            records.len(),
            self.path,
            self.table
        );
        Ok(Store::from_records(records))
    }

    fn save(&self, store: &Store) -> Result<(), StoreError> {
        let mut conn = self.open().map_err(|e| self.save_error(e))?;
        self.prepare_schema(&conn)?;
        self.write_rows(&mut conn, store)
            .map_err(|e| self.save_error(e))?;

        tracing::debug!(
            "Saved {} commit records to {:?} table '{}'",
            store.len(),
            self.path,
            self.table
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn describe(&self) -> String {
        format!("TABLE='{}'", self.table)
    }
}
