use thiserror::Error;

use crate::store::StoreError;
use crate::table::Table;
use crate::types::ValidationError;

/// Errors from resolving attendees and registering sessions.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The store rejected a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Polling ran out before the store assigned an id to the appended row.
    #[error("no id assigned in {table} after {attempts} attempts")]
    IdNotAssigned { table: Table, attempts: u32 },

    /// The id cell held something other than a positive integer.
    #[error("invalid id in {table}: {source}")]
    InvalidId {
        table: Table,
        #[source]
        source: ValidationError,
    },

    /// A matching row exists but its id has not been assigned yet.
    #[error("matched {table} row {row} has no id yet")]
    MatchWithoutId { table: Table, row: usize },

    /// The table has no store-assigned id column.
    #[error("{table} has no id column")]
    NoIdColumn { table: Table },
}
