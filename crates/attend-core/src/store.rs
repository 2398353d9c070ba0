//! Store adapter contract for the attendance tables.
//!
//! Backends are plain tabular stores: no transactions, no uniqueness
//! constraints, and identifiers that the store assigns on its own schedule.
//! Everything the engine needs is expressed through three primitives on
//! [`TableStore`] plus [`await_assigned_id`], which turns the store's
//! eventual id assignment into a bounded, polled event.
//!
//! # Row addressing
//!
//! Row and column positions are 0-based. Row `n` is the `n`th record returned
//! by [`TableStore::read_all`]; column `n` is `table.columns()[n]`.

use std::str::FromStr;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::error::EngineError;
use crate::table::{CellValue, Record, Table};
use crate::types::ValidationError;

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row position past the end of the table.
    #[error("{table} has no row {row}")]
    RowOutOfRange { table: Table, row: usize },
    /// A column position past the end of the table's columns.
    #[error("{table} has no column {column}")]
    ColumnOutOfRange { table: Table, column: usize },
    /// An append whose width does not match the table.
    #[error("{table} expects {expected} values, got {actual}")]
    RowWidth {
        table: Table,
        expected: usize,
        actual: usize,
    },
    /// Failure inside the concrete backend (network, SQL, API).
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// The narrow interface the reconciliation engine is written against.
pub trait TableStore {
    /// Point-in-time read of every data row, in table order.
    fn read_all(&mut self, table: Table) -> Result<Vec<Record>, StoreError>;

    /// Appends one row. `values` must have one entry per column.
    fn append_row(&mut self, table: Table, values: &[CellValue]) -> Result<(), StoreError>;

    /// Overwrites a single cell of an existing row.
    fn update_cell(
        &mut self,
        table: Table,
        row: usize,
        column: usize,
        value: &CellValue,
    ) -> Result<(), StoreError>;
}

/// Timing knobs for waiting on the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// How many times the last row is re-read before giving up.
    pub attempts: u32,
    /// Sleep before each re-read.
    pub interval: Duration,
    /// Sleep after a cell update, to stay under remote write quotas.
    pub write_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            interval: Duration::from_secs(2),
            write_pause: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps. Useful for local stores and tests.
    pub const fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            interval: Duration::ZERO,
            write_pause: Duration::ZERO,
        }
    }
}

/// Polls `table` until the row just appended carries a store-assigned id.
///
/// The last row only counts once its non-id cells equal `appended`; until
/// then the append is treated as not yet visible.
pub fn await_assigned_id<S, T>(
    store: &mut S,
    table: Table,
    appended: &[CellValue],
    policy: &RetryPolicy,
) -> Result<T, EngineError>
where
    S: TableStore + ?Sized,
    T: FromStr<Err = ValidationError>,
{
    let id_column = table
        .id_column()
        .ok_or(EngineError::NoIdColumn { table })?;
    let id_header = table.columns()[id_column];

    for attempt in 1..=policy.attempts {
        thread::sleep(policy.interval);
        let rows = store.read_all(table)?;
        let Some(last) = rows.last() else {
            debug!(%table, attempt, "table still empty after append");
            continue;
        };
        if !is_appended_row(last, table, id_column, appended) {
            debug!(%table, attempt, "appended row not visible yet");
            continue;
        }
        let id = last.get(id_header).trim();
        if id.is_empty() {
            debug!(%table, attempt, "id not assigned yet");
            continue;
        }
        return id
            .parse()
            .map_err(|source| EngineError::InvalidId { table, source });
    }

    Err(EngineError::IdNotAssigned {
        table,
        attempts: policy.attempts,
    })
}

fn is_appended_row(record: &Record, table: Table, id_column: usize, appended: &[CellValue]) -> bool {
    table
        .columns()
        .iter()
        .zip(appended)
        .enumerate()
        .filter(|(idx, _)| *idx != id_column)
        .all(|(_, (column, written))| record.get(column).trim() == written.render().trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::memory::{IdAssignment, MemoryStore};
    use crate::types::SessionId;

    fn session_row(url: &str) -> Vec<CellValue> {
        vec![
            CellValue::Empty,
            CellValue::from(url),
            CellValue::from("Week 1"),
            CellValue::from("2025-03-03"),
        ]
    }

    #[test]
    fn returns_id_once_visible() {
        let mut store = MemoryStore::new(IdAssignment::AfterReads(1));
        let row = session_row("https://a");
        store.append_row(Table::Sessions, &row).unwrap();

        let id: SessionId =
            await_assigned_id(&mut store, Table::Sessions, &row, &RetryPolicy::immediate(3))
                .unwrap();
        assert_eq!(id.get(), 1);
    }

    #[test]
    fn gives_up_after_attempts() {
        let mut store = MemoryStore::new(IdAssignment::Never);
        let row = session_row("https://a");
        store.append_row(Table::Sessions, &row).unwrap();

        let err = await_assigned_id::<_, SessionId>(
            &mut store,
            Table::Sessions,
            &row,
            &RetryPolicy::immediate(3),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::IdNotAssigned {
                table: Table::Sessions,
                attempts: 3
            }
        ));
        assert_eq!(store.reads(Table::Sessions), 3);
    }

    #[test]
    fn ignores_stale_last_row() {
        let mut store = MemoryStore::new(IdAssignment::Immediate);
        let old = session_row("https://old");
        store.append_row(Table::Sessions, &old).unwrap();

        let pending = session_row("https://new");
        let err = await_assigned_id::<_, SessionId>(
            &mut store,
            Table::Sessions,
            &pending,
            &RetryPolicy::immediate(2),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::IdNotAssigned { .. }));
    }

    #[test]
    fn rejects_non_numeric_id() {
        let mut store = MemoryStore::new(IdAssignment::Never);
        let row = vec![
            CellValue::Text("#REF!".to_string()),
            CellValue::from("https://a"),
            CellValue::from("Week 1"),
            CellValue::from("2025-03-03"),
        ];
        store.append_row(Table::Sessions, &row).unwrap();

        let err = await_assigned_id::<_, SessionId>(
            &mut store,
            Table::Sessions,
            &row,
            &RetryPolicy::immediate(1),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidId { .. }));
    }

    #[test]
    fn log_table_has_no_id_to_await() {
        let mut store = MemoryStore::new(IdAssignment::Immediate);
        let err = await_assigned_id::<_, SessionId>(
            &mut store,
            Table::AttendanceLog,
            &[],
            &RetryPolicy::immediate(1),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NoIdColumn { .. }));
    }
}
