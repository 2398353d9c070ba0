//! Import a quiz export into the attendance store.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use attend_core::{ImportReport, ParticipantOutcome, RetryPolicy, TableStore, run_import};
use clap::Args;

use super::plan::{PreparedImport, prepare, write_summary};
use crate::{Config, store};

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Quiz export workbook (.xlsx).
    #[arg(short, long)]
    pub file: PathBuf,

    /// Link to the session recording or page.
    #[arg(short, long)]
    pub url: String,

    /// Session title.
    #[arg(short, long)]
    pub title: String,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Do not ask the LLM which names look real.
    #[arg(long)]
    pub skip_name_check: bool,
}

pub fn run<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    args: &ImportArgs,
    config: &Config,
) -> Result<()> {
    let prepared = prepare(
        &args.file,
        &args.url,
        &args.title,
        !args.skip_name_check,
        config,
    )?;
    let mut store = store::open(config)?;
    writeln!(writer, "Store: {}", store::describe(config))?;
    execute(
        reader,
        writer,
        store.as_mut(),
        &prepared,
        &config.retry_policy(),
        args.yes,
    )
}

/// Summary, confirmation, then the import itself.
pub fn execute<R: BufRead, W: Write, S: TableStore + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    store: &mut S,
    prepared: &PreparedImport,
    policy: &RetryPolicy,
    assume_yes: bool,
) -> Result<()> {
    write_summary(writer, prepared)?;

    if prepared.plan.participants.is_empty() {
        writeln!(writer, "No participants to import.")?;
        return Ok(());
    }

    if !assume_yes && !confirm(reader, writer, "Proceed with import? (yes/no): ")? {
        writeln!(writer, "Import cancelled.")?;
        return Ok(());
    }

    let report = run_import(store, &prepared.plan, policy).context("failed to create session")?;
    write_tally(writer, &report)
}

/// Reads one line and accepts `yes` or `y`, ignoring case.
pub fn confirm<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, prompt: &str) -> Result<bool> {
    write!(writer, "{prompt}")?;
    writer.flush()?;
    let mut answer = String::new();
    reader
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    writeln!(writer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "yes" | "y"))
}

fn write_tally<W: Write>(writer: &mut W, report: &ImportReport) -> Result<()> {
    writeln!(writer, "Import complete (session {})", report.session_id)?;
    writeln!(writer, "  logged with email: {}", report.logged_with_email())?;
    writeln!(writer, "  logged without email: {}", report.logged_blank_email())?;
    writeln!(writer, "  failed: {}", report.failed())?;
    for outcome in &report.outcomes {
        if let ParticipantOutcome::Failed { name, error } = outcome {
            writeln!(writer, "  - {name}: {error}")?;
        }
    }
    Ok(())
}
