//! Attendance log: append-only (attendee, session) facts.

use tracing::debug;

use crate::store::{StoreError, TableStore};
use crate::table::{CellValue, Table};
use crate::types::{AttendeeId, SessionId};

/// Appends one attendance fact. No read-before-write; duplicates are allowed.
pub fn log_attendance<S: TableStore + ?Sized>(
    store: &mut S,
    attendee: AttendeeId,
    session: SessionId,
) -> Result<(), StoreError> {
    store.append_row(
        Table::AttendanceLog,
        &[CellValue::from(attendee), CellValue::from(session)],
    )?;
    debug!(%attendee, %session, "logged attendance");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::memory::{IdAssignment, MemoryStore};

    #[test]
    fn appends_without_dedup() {
        let mut store = MemoryStore::new(IdAssignment::Immediate);
        let attendee = AttendeeId::new(3).unwrap();
        let session = SessionId::new(9).unwrap();

        log_attendance(&mut store, attendee, session).unwrap();
        log_attendance(&mut store, attendee, session).unwrap();

        assert_eq!(
            store.rows(Table::AttendanceLog),
            vec![vec!["3", "9"], vec!["3", "9"]]
        );
        assert_eq!(store.reads(Table::AttendanceLog), 0);
    }
}
