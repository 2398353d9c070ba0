//! Show what an import would do without touching the store.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::plan::{prepare, write_summary};
use crate::Config;

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Quiz export workbook (.xlsx).
    #[arg(short, long)]
    pub file: PathBuf,

    /// Session title to show in the summary.
    #[arg(short, long, default_value = "(untitled)")]
    pub title: String,

    /// Do not ask the LLM which names look real.
    #[arg(long)]
    pub skip_name_check: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &PreviewArgs, config: &Config) -> Result<()> {
    let prepared = prepare(&args.file, "", &args.title, !args.skip_name_check, config)?;
    write_summary(writer, &prepared)?;
    writeln!(writer, "Preview only, nothing was written.")?;
    Ok(())
}
