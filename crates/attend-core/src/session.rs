//! Session registration: one fresh session row per import run.

use chrono::NaiveDate;
use tracing::info;

use crate::error::EngineError;
use crate::store::{RetryPolicy, TableStore, await_assigned_id};
use crate::table::{CellValue, Table};
use crate::types::SessionId;

/// Date format stored in the session `date` column.
pub const SESSION_DATE_FORMAT: &str = "%Y-%m-%d";

/// Details of the session being imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub url: String,
    pub title: String,
    pub date: NaiveDate,
}

/// Appends a session row and waits for its id.
///
/// Sessions are never deduplicated: running twice creates two sessions.
pub fn create_session<S: TableStore + ?Sized>(
    store: &mut S,
    session: &NewSession,
    policy: &RetryPolicy,
) -> Result<SessionId, EngineError> {
    let values = vec![
        CellValue::Empty,
        CellValue::from(session.url.as_str()),
        CellValue::from(session.title.as_str()),
        CellValue::Text(session.date.format(SESSION_DATE_FORMAT).to_string()),
    ];
    store.append_row(Table::Sessions, &values)?;
    let id: SessionId = await_assigned_id(store, Table::Sessions, &values, policy)?;
    info!(%id, title = %session.title, "created session");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::memory::{IdAssignment, MemoryStore};

    fn session() -> NewSession {
        NewSession {
            url: "https://example.com/s/1".to_string(),
            title: "Intro to Transformers".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        }
    }

    #[test]
    fn writes_iso_date_and_returns_assigned_id() {
        let mut store = MemoryStore::new(IdAssignment::AfterReads(2));

        let id = create_session(&mut store, &session(), &RetryPolicy::immediate(2)).unwrap();

        assert_eq!(id.get(), 1);
        assert_eq!(
            store.rows(Table::Sessions),
            vec![vec![
                "1",
                "https://example.com/s/1",
                "Intro to Transformers",
                "2025-03-03"
            ]]
        );
    }

    #[test]
    fn same_details_create_a_second_session() {
        let mut store = MemoryStore::new(IdAssignment::Immediate);
        let policy = RetryPolicy::immediate(1);

        let first = create_session(&mut store, &session(), &policy).unwrap();
        let second = create_session(&mut store, &session(), &policy).unwrap();

        assert_ne!(first, second);
        assert_eq!(store.rows(Table::Sessions).len(), 2);
    }

    #[test]
    fn reports_failure_when_id_never_appears() {
        let mut store = MemoryStore::new(IdAssignment::Never);

        let err = create_session(&mut store, &session(), &RetryPolicy::immediate(2)).unwrap_err();

        assert!(matches!(
            err,
            EngineError::IdNotAssigned {
                table: Table::Sessions,
                attempts: 2
            }
        ));
    }
}
