//! In-memory [`TableStore`] with simulated id-assignment lag.
//!
//! Mirrors a spreadsheet whose id column is filled by a formula some time
//! after the row lands. Useful for testing; the data is gone when the store
//! is dropped.

use std::collections::HashMap;

use thiserror::Error;

use crate::store::{StoreError, TableStore};
use crate::table::{CellValue, Record, Table};

/// When the store fills in an id left empty by an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdAssignment {
    /// Visible on the very next read.
    Immediate,
    /// Visible on the `n`th read after the append.
    AfterReads(u32),
    /// Never assigned.
    Never,
}

/// Write failure injected with [`MemoryStore::fail_writes`].
#[derive(Debug, Error)]
#[error("simulated write failure on {0}")]
pub struct InjectedFailure(Table);

#[derive(Debug, Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    pending: Vec<(usize, u32)>,
    next_id: i64,
    reads: usize,
    fail_writes: bool,
}

/// Tabular store held in memory.
#[derive(Debug)]
pub struct MemoryStore {
    default_assignment: IdAssignment,
    assignments: HashMap<Table, IdAssignment>,
    tables: HashMap<Table, TableState>,
}

impl MemoryStore {
    pub fn new(assignment: IdAssignment) -> Self {
        let tables = Table::ALL
            .into_iter()
            .map(|table| {
                let state = TableState {
                    next_id: 1,
                    ..TableState::default()
                };
                (table, state)
            })
            .collect();
        Self {
            default_assignment: assignment,
            assignments: HashMap::new(),
            tables,
        }
    }

    /// Overrides the id assignment behaviour for one table.
    #[must_use]
    pub fn with_assignment(mut self, table: Table, assignment: IdAssignment) -> Self {
        self.assignments.insert(table, assignment);
        self
    }

    /// Seeds a table with existing rows. Later ids continue after the largest seeded id.
    #[must_use]
    pub fn with_rows(mut self, table: Table, rows: &[&[&str]]) -> Self {
        let width = table.columns().len();
        let state = self.state_mut(table);
        for row in rows {
            let mut cells: Vec<String> = row.iter().map(|cell| (*cell).to_string()).collect();
            cells.resize(width, String::new());
            if let Some(id) = table
                .id_column()
                .and_then(|column| cells[column].trim().parse::<i64>().ok())
            {
                state.next_id = state.next_id.max(id + 1);
            }
            state.rows.push(cells);
        }
        self
    }

    /// Makes every subsequent append or update on `table` fail.
    pub fn fail_writes(&mut self, table: Table) {
        self.state_mut(table).fail_writes = true;
    }

    /// Raw cells of every row, including ids that are not yet visible as blanks.
    pub fn rows(&self, table: Table) -> Vec<Vec<String>> {
        self.tables
            .get(&table)
            .map(|state| state.rows.clone())
            .unwrap_or_default()
    }

    /// Number of `read_all` calls made against `table`.
    pub fn reads(&self, table: Table) -> usize {
        self.tables.get(&table).map_or(0, |state| state.reads)
    }

    fn assignment(&self, table: Table) -> IdAssignment {
        self.assignments
            .get(&table)
            .copied()
            .unwrap_or(self.default_assignment)
    }

    fn state_mut(&mut self, table: Table) -> &mut TableState {
        self.tables.entry(table).or_default()
    }
}

impl TableState {
    fn assign(&mut self, row: usize, id_column: usize) {
        self.rows[row][id_column] = self.next_id.to_string();
        self.next_id += 1;
    }

    fn settle(&mut self, id_column: usize) {
        let mut due = Vec::new();
        self.pending.retain_mut(|(row, remaining)| {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                due.push(*row);
                false
            } else {
                true
            }
        });
        for row in due {
            self.assign(row, id_column);
        }
    }
}

impl TableStore for MemoryStore {
    fn read_all(&mut self, table: Table) -> Result<Vec<Record>, StoreError> {
        let state = self.state_mut(table);
        state.reads += 1;
        if let Some(id_column) = table.id_column() {
            state.settle(id_column);
        }
        Ok(state
            .rows
            .iter()
            .map(|row| Record::from_row(table.columns(), row))
            .collect())
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
        let assignment = self.assignment(table);
        let state = self.state_mut(table);
        if state.fail_writes {
            return Err(StoreError::backend(InjectedFailure(table)));
        }

        state.rows.push(values.iter().map(CellValue::render).collect());
        let row = state.rows.len() - 1;
        if let Some(id_column) = table.id_column() {
            if values[id_column].is_empty() {
                match assignment {
                    IdAssignment::Immediate | IdAssignment::AfterReads(0) => {
                        state.assign(row, id_column);
                    }
                    IdAssignment::AfterReads(reads) => state.pending.push((row, reads)),
                    IdAssignment::Never => {}
                }
            }
        }
        Ok(())
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
        let state = self.state_mut(table);
        if state.fail_writes {
            return Err(StoreError::backend(InjectedFailure(table)));
        }
        let cells = state
            .rows
            .get_mut(row)
            .ok_or(StoreError::RowOutOfRange { table, row })?;
        cells[column] = value.render();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attendee(name: &str) -> Vec<CellValue> {
        vec![CellValue::Empty, CellValue::from(name), CellValue::Empty]
    }

    #[test]
    fn immediate_assignment_is_sequential() {
        let mut store = MemoryStore::new(IdAssignment::Immediate);
        store.append_row(Table::Attendees, &attendee("A")).unwrap();
        store.append_row(Table::Attendees, &attendee("B")).unwrap();

        let rows = store.read_all(Table::Attendees).unwrap();
        assert_eq!(rows[0].get("id"), "1");
        assert_eq!(rows[1].get("id"), "2");
    }

    #[test]
    fn lagged_assignment_appears_on_nth_read() {
        let mut store = MemoryStore::new(IdAssignment::AfterReads(2));
        store.append_row(Table::Attendees, &attendee("A")).unwrap();

        let first = store.read_all(Table::Attendees).unwrap();
        assert_eq!(first[0].get("id"), "");
        let second = store.read_all(Table::Attendees).unwrap();
        assert_eq!(second[0].get("id"), "1");
    }

    #[test]
    fn seeded_rows_advance_next_id() {
        let mut store = MemoryStore::new(IdAssignment::Immediate)
            .with_rows(Table::Attendees, &[&["9", "Old", "old@x.com"]]);
        store.append_row(Table::Attendees, &attendee("New")).unwrap();

        let rows = store.read_all(Table::Attendees).unwrap();
        assert_eq!(rows[1].get("id"), "10");
    }

    #[test]
    fn append_checks_width() {
        let mut store = MemoryStore::new(IdAssignment::Immediate);
        let err = store
            .append_row(Table::AttendanceLog, &[CellValue::Integer(1)])
            .unwrap_err();
        assert!(matches!(err, StoreError::RowWidth { expected: 2, .. }));
    }

    #[test]
    fn update_out_of_range_row_errors() {
        let mut store = MemoryStore::new(IdAssignment::Immediate);
        let err = store
            .update_cell(Table::Attendees, 3, 2, &CellValue::from("x@y.com"))
            .unwrap_err();
        assert!(matches!(err, StoreError::RowOutOfRange { row: 3, .. }));
    }

    #[test]
    fn injected_failures_surface_as_backend_errors() {
        let mut store = MemoryStore::new(IdAssignment::Immediate);
        store.fail_writes(Table::Attendees);
        let err = store.append_row(Table::Attendees, &attendee("A")).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
