//! SQLite storage backend for attendance reconciliation.
//!
//! A transactional local substitute for the remote spreadsheet. It implements
//! the same [`TableStore`] contract, so the engine runs unchanged; ids are
//! assigned by `INTEGER PRIMARY KEY AUTOINCREMENT` inside the insert and are
//! therefore visible on the first poll.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Imports are sequential, so a single owned instance is all that is needed.
//!
//! # Schema
//!
//! Table and column names match [`Table::as_str`] and [`Table::columns`]:
//! `attendees(id, name, email)`, `sessions(id, url, title, date)` and
//! `attendance_log(attendee_id, session_id)`. Blank emails are stored as `''`,
//! not `NULL`, to read back exactly like an empty spreadsheet cell.
//!
//! Row positions used by [`TableStore::update_cell`] follow `rowid` order,
//! which is also the order [`TableStore::read_all`] returns.

use std::path::Path;

use attend_core::{CellValue, Record, StoreError, Table, TableStore};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use thiserror::Error;
use tracing::debug;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::backend(err)
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS attendees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_attendees_email ON attendees(email COLLATE NOCASE);

            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                title TEXT NOT NULL,
                date TEXT NOT NULL
            );

            -- Append-only multiset: no primary key, duplicates allowed.
            CREATE TABLE IF NOT EXISTS attendance_log (
                attendee_id INTEGER NOT NULL,
                session_id INTEGER NOT NULL,
                FOREIGN KEY (attendee_id) REFERENCES attendees(id),
                FOREIGN KEY (session_id) REFERENCES sessions(id)
            );

            CREATE INDEX IF NOT EXISTS idx_attendance_log_session ON attendance_log(session_id);
            ",
        )?;
        Ok(())
    }

    fn select_all(&self, table: Table) -> Result<Vec<Record>, DbError> {
        let columns = table.columns();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {table} ORDER BY rowid ASC",
            columns.join(", ")
        ))?;
        let rows = stmt.query_map([], |row| {
            let mut cells = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                cells.push(cell_text(row.get_ref(idx)?));
            }
            Ok(Record::from_row(columns, &cells))
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn insert(&self, table: Table, values: &[CellValue]) -> Result<(), DbError> {
        let columns = table.columns();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        );
        let bound = values
            .iter()
            .enumerate()
            .map(|(idx, value)| sql_value(table, idx, value));
        self.conn.execute(&sql, params_from_iter(bound))?;
        debug!(%table, rowid = self.conn.last_insert_rowid(), "inserted row");
        Ok(())
    }

    fn rowid_at(&self, table: Table, row: usize) -> Result<Option<i64>, DbError> {
        let offset = i64::try_from(row).unwrap_or(i64::MAX);
        let rowid = self
            .conn
            .query_row(
                &format!("SELECT rowid FROM {table} ORDER BY rowid ASC LIMIT 1 OFFSET ?1"),
                params![offset],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rowid)
    }

    fn update(
        &self,
        table: Table,
        rowid: i64,
        column: usize,
        value: &CellValue,
    ) -> Result<(), DbError> {
        let name = table.columns()[column];
        self.conn.execute(
            &format!("UPDATE {table} SET {name} = ?1 WHERE rowid = ?2"),
            params![sql_value(table, column, value), rowid],
        )?;
        Ok(())
    }
}

impl TableStore for Database {
    fn read_all(&mut self, table: Table) -> Result<Vec<Record>, StoreError> {
        Ok(self.select_all(table)?)
    }

    fn append_row(&mut self, table: Table, values: &[CellValue]) -> Result<(), StoreError> {
        let expected = table.columns().len();
        if values.len() != expected {
            return Err(StoreError::RowWidth {
                table,
                expected,
                actual: values.len(),
            });
        }
        Ok(self.insert(table, values)?)
    }

    fn update_cell(
        &mut self,
        table: Table,
        row: usize,
        column: usize,
        value: &CellValue,
    ) -> Result<(), StoreError> {
        if column >= table.columns().len() {
            return Err(StoreError::ColumnOutOfRange { table, column });
        }
        let rowid = self
            .rowid_at(table, row)?
            .ok_or(StoreError::RowOutOfRange { table, row })?;
        Ok(self.update(table, rowid, column, value)?)
    }
}

/// `Empty` becomes `NULL` in an id column (so SQLite assigns the key) and `''`
/// everywhere else.
fn sql_value(table: Table, column: usize, value: &CellValue) -> Value {
    match value {
        CellValue::Empty if table.id_column() == Some(column) => Value::Null,
        CellValue::Empty => Value::Text(String::new()),
        CellValue::Text(text) => Value::Text(text.clone()),
        CellValue::Integer(number) => Value::Integer(*number),
    }
}

fn cell_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(number) => number.to_string(),
        ValueRef::Real(number) => number.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}
