//! One import run: register the session, then resolve and log each participant.
//!
//! Participants are processed strictly one at a time. A failure on one
//! participant is logged and counted; a failure creating the session aborts
//! the run before any attendance is written.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::{info, warn};

use crate::attendance::log_attendance;
use crate::error::EngineError;
use crate::reconcile::{ResolvedAttendee, resolve_attendee};
use crate::session::{NewSession, create_session};
use crate::store::{RetryPolicy, TableStore};
use crate::types::{Email, SessionId};

/// A participant ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub email: Option<Email>,
}

/// Pairs each name with its email, if the export had a valid one.
pub fn pair_participants<S: BuildHasher>(
    names: &[String],
    emails: &HashMap<String, Email, S>,
) -> Vec<Participant> {
    names
        .iter()
        .map(|name| Participant {
            name: name.clone(),
            email: emails.get(name).cloned(),
        })
        .collect()
}

/// Everything needed to run an import.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub session: NewSession,
    pub participants: Vec<Participant>,
}

impl ImportPlan {
    pub fn with_email(&self) -> usize {
        self.participants
            .iter()
            .filter(|participant| participant.email.is_some())
            .count()
    }

    pub fn without_email(&self) -> usize {
        self.participants.len() - self.with_email()
    }
}

/// What happened to one participant.
#[derive(Debug)]
pub enum ParticipantOutcome {
    Logged {
        name: String,
        attendee: ResolvedAttendee,
        blank_email: bool,
    },
    Failed {
        name: String,
        error: EngineError,
    },
}

impl ParticipantOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Logged { name, .. } | Self::Failed { name, .. } => name,
        }
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct ImportReport {
    pub session_id: SessionId,
    pub outcomes: Vec<ParticipantOutcome>,
}

impl ImportReport {
    pub fn logged_with_email(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                ParticipantOutcome::Logged {
                    blank_email: false,
                    ..
                }
            )
        })
    }

    pub fn logged_blank_email(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                ParticipantOutcome::Logged {
                    blank_email: true,
                    ..
                }
            )
        })
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ParticipantOutcome::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&ParticipantOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|outcome| predicate(outcome)).count()
    }
}

/// Runs an import against `store`.
///
/// Returns `Err` only when the session cannot be created.
pub fn run_import<S: TableStore + ?Sized>(
    store: &mut S,
    plan: &ImportPlan,
    policy: &RetryPolicy,
) -> Result<ImportReport, EngineError> {
    let session_id = create_session(store, &plan.session, policy)?;

    let mut outcomes = Vec::with_capacity(plan.participants.len());
    for participant in &plan.participants {
        let outcome = match import_participant(store, participant, session_id, policy) {
            Ok(attendee) => ParticipantOutcome::Logged {
                name: participant.name.clone(),
                attendee,
                blank_email: participant.email.is_none(),
            },
            Err(error) => {
                warn!(name = %participant.name, %error, "skipping participant");
                ParticipantOutcome::Failed {
                    name: participant.name.clone(),
                    error,
                }
            }
        };
        outcomes.push(outcome);
    }

    let report = ImportReport {
        session_id,
        outcomes,
    };
    info!(
        %session_id,
        with_email = report.logged_with_email(),
        blank_email = report.logged_blank_email(),
        failed = report.failed(),
        "import finished"
    );
    Ok(report)
}

fn import_participant<S: TableStore + ?Sized>(
    store: &mut S,
    participant: &Participant,
    session_id: SessionId,
    policy: &RetryPolicy,
) -> Result<ResolvedAttendee, EngineError> {
    let attendee = resolve_attendee(
        store,
        &participant.name,
        participant.email.as_ref(),
        policy,
    )?;
    log_attendance(store, attendee.id, session_id)?;
    Ok(attendee)
}
