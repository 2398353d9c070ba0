//! Core domain logic for attendance reconciliation.
//!
//! This crate contains:
//! - Store contract: the [`TableStore`] trait and id-assignment polling
//! - Reconciliation: matching participants to long-lived attendee rows
//! - Session registration and the append-only attendance log
//! - Export reading: participants, session date and emails from a quiz export

pub mod attendance;
mod error;
pub mod export;
pub mod memory;
pub mod pipeline;
pub mod plausibility;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod table;
pub mod types;

pub use attendance::log_attendance;
pub use error::EngineError;
pub use export::{ExportError, ExportWorkbook};
pub use pipeline::{ImportPlan, ImportReport, Participant, ParticipantOutcome, run_import};
pub use plausibility::Screening;
pub use reconcile::{AttendeeAction, ResolvedAttendee, resolve_attendee};
pub use session::{NewSession, create_session};
pub use store::{RetryPolicy, StoreError, TableStore, await_assigned_id};
pub use table::{CellValue, Record, Table};
pub use types::{AttendeeId, Email, SessionId, ValidationError};
