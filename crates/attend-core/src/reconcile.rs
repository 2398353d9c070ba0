//! Attendee reconciliation: map a participant onto exactly one attendee row.
//!
//! Matching precedence:
//! 1. email, compared case-insensitively;
//! 2. name, compared case-insensitively, but only against rows whose email is
//!    still blank (and the blank is then backfilled);
//! 3. otherwise a new row is appended and its id awaited.
//!
//! Without an email, the first row with a matching name wins, whatever its
//! email.
//!
//! The first matching row in table order wins. Nothing here guards against two
//! writers racing on the same table.

use std::thread;

use tracing::{debug, info};

use crate::error::EngineError;
use crate::store::{RetryPolicy, TableStore, await_assigned_id};
use crate::table::{CellValue, Record, Table};
use crate::types::{AttendeeId, Email};

const NAME: &str = "name";
const EMAIL: &str = "email";
const ID: &str = "id";
const EMAIL_COLUMN: usize = 2;

/// What reconciliation did to produce an attendee id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendeeAction {
    /// An existing row with the same email.
    MatchedEmail,
    /// An existing row with the same name; no email was supplied.
    MatchedName,
    /// An existing blank-email row with the same name, now carrying the email.
    BackfilledEmail,
    /// A freshly appended row.
    Created,
}

/// Outcome of [`resolve_attendee`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAttendee {
    pub id: AttendeeId,
    pub action: AttendeeAction,
}

/// Finds or creates the attendee row for a participant.
pub fn resolve_attendee<S: TableStore + ?Sized>(
    store: &mut S,
    name: &str,
    email: Option<&Email>,
    policy: &RetryPolicy,
) -> Result<ResolvedAttendee, EngineError> {
    let records = store.read_all(Table::Attendees)?;
    debug!(name, rows = records.len(), "loaded attendee snapshot");

    let found = match email {
        Some(email) => find_by_email(&records, email)
            .map(|row| (row, AttendeeAction::MatchedEmail))
            .or_else(|| {
                find_blank_email_by_name(&records, name)
                    .map(|row| (row, AttendeeAction::BackfilledEmail))
            }),
        None => find_by_name(&records, name).map(|row| (row, AttendeeAction::MatchedName)),
    };

    if let Some((row, action)) = found {
        let id = existing_id(&records[row], row)?;
        if let (AttendeeAction::BackfilledEmail, Some(email)) = (action, email) {
            backfill_email(store, row, email, policy)?;
        }
        info!(name, %id, ?action, "resolved existing attendee");
        return Ok(ResolvedAttendee { id, action });
    }

    let values = vec![
        CellValue::Empty,
        CellValue::from(name),
        email.map_or(CellValue::Empty, |email| CellValue::from(email.as_str())),
    ];
    store.append_row(Table::Attendees, &values)?;
    let id: AttendeeId = await_assigned_id(store, Table::Attendees, &values, policy)?;
    info!(name, %id, "created attendee");
    Ok(ResolvedAttendee {
        id,
        action: AttendeeAction::Created,
    })
}

fn find_by_email(records: &[Record], email: &Email) -> Option<usize> {
    records
        .iter()
        .position(|record| !record.get(EMAIL).trim().is_empty() && email.matches(record.get(EMAIL)))
}

fn find_blank_email_by_name(records: &[Record], name: &str) -> Option<usize> {
    records
        .iter()
        .position(|record| same_name(record, name) && record.get(EMAIL).trim().is_empty())
}

fn find_by_name(records: &[Record], name: &str) -> Option<usize> {
    records.iter().position(|record| same_name(record, name))
}

fn same_name(record: &Record, name: &str) -> bool {
    record.get(NAME).trim().to_lowercase() == name.trim().to_lowercase()
}

fn existing_id(record: &Record, row: usize) -> Result<AttendeeId, EngineError> {
    let raw = record.get(ID);
    if raw.trim().is_empty() {
        return Err(EngineError::MatchWithoutId {
            table: Table::Attendees,
            row,
        });
    }
    raw.parse().map_err(|source| EngineError::InvalidId {
        table: Table::Attendees,
        source,
    })
}

fn backfill_email<S: TableStore + ?Sized>(
    store: &mut S,
    row: usize,
    email: &Email,
    policy: &RetryPolicy,
) -> Result<(), EngineError> {
    store.update_cell(
        Table::Attendees,
        row,
        EMAIL_COLUMN,
        &CellValue::from(email.as_str()),
    )?;
    thread::sleep(policy.write_pause);
    Ok(())
}
