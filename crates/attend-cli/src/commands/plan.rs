//! Reading an export into an import plan and describing it to the operator.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use attend_core::pipeline::pair_participants;
use attend_core::session::SESSION_DATE_FORMAT;
use attend_core::{ExportWorkbook, ImportPlan, NewSession, Screening};
use attend_llm::Client;
use tracing::{info, warn};

use crate::Config;

/// How the name check went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameCheck {
    Skipped,
    Unavailable(String),
    Screened { removed: Vec<String> },
}

/// An import plan plus what the operator needs to see before confirming.
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub plan: ImportPlan,
    pub name_check: NameCheck,
}

/// Reads the export and screens its participant names.
pub fn prepare(
    file: &Path,
    url: &str,
    title: &str,
    check_names: bool,
    config: &Config,
) -> Result<PreparedImport> {
    let workbook = ExportWorkbook::open(file)?;
    let names = workbook
        .list_participants()
        .context("failed to list participants")?;
    let date = workbook
        .extract_session_date()
        .context("failed to read session date")?;
    let emails = workbook
        .extract_email_mapping()
        .context("failed to read participant emails")?;
    info!(participants = names.len(), emails = emails.len(), %date, "read export");

    let (kept, name_check) = if check_names {
        let screening = screen(config, &names)?;
        let (kept, removed) = screening.partition(names);
        let name_check = match screening {
            Screening::Screened(_) => NameCheck::Screened { removed },
            Screening::Unavailable(reason) => NameCheck::Unavailable(reason),
        };
        (kept, name_check)
    } else {
        (names, NameCheck::Skipped)
    };

    Ok(PreparedImport {
        plan: ImportPlan {
            session: NewSession {
                url: url.to_string(),
                title: title.to_string(),
                date,
            },
            participants: pair_participants(&kept, &emails),
        },
        name_check,
    })
}

/// Runs the name check on its own short-lived runtime.
///
/// The runtime is gone before any blocking store call is made.
fn screen(config: &Config, names: &[String]) -> Result<Screening> {
    let Some(api_key) = config.llm_api_key() else {
        warn!("no LLM API key configured, keeping all names");
        return Ok(Screening::Unavailable("no API key configured".to_string()));
    };
    let client = match Client::new(api_key) {
        Ok(client) => client.with_base_url(config.llm.base_url.clone()),
        Err(err) => {
            warn!(error = %err, "name check unavailable, keeping all names");
            return Ok(Screening::Unavailable(err.to_string()));
        }
    };
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    Ok(runtime.block_on(client.screen(&config.llm.model, names)))
}

/// Writes the pre-write summary.
pub fn write_summary<W: Write>(writer: &mut W, prepared: &PreparedImport) -> Result<()> {
    let plan = &prepared.plan;
    writeln!(writer, "Session: {}", plan.session.title)?;
    if !plan.session.url.is_empty() {
        writeln!(writer, "URL: {}", plan.session.url)?;
    }
    writeln!(
        writer,
        "Date: {}",
        plan.session.date.format(SESSION_DATE_FORMAT)
    )?;

    match &prepared.name_check {
        NameCheck::Skipped => writeln!(writer, "Name check: skipped")?,
        NameCheck::Unavailable(reason) => {
            writeln!(writer, "Name check: unavailable ({reason}), keeping all names")?;
        }
        NameCheck::Screened { removed } if removed.is_empty() => {
            writeln!(writer, "Name check: all names kept")?;
        }
        NameCheck::Screened { removed } => {
            writeln!(writer, "Name check: removed {} name(s)", removed.len())?;
            for name in removed {
                writeln!(writer, "  - {name}")?;
            }
        }
    }

    writeln!(writer, "Participants: {}", plan.participants.len())?;
    writeln!(writer, "  with email: {}", plan.with_email())?;
    writeln!(writer, "  without email: {}", plan.without_email())?;
    for participant in &plan.participants {
        match &participant.email {
            Some(email) => writeln!(writer, "  - {} <{email}>", participant.name)?,
            None => writeln!(writer, "  - {}", participant.name)?,
        }
    }
    Ok(())
}
