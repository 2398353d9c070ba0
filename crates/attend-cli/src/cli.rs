//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::import::ImportArgs;
use crate::commands::preview::PreviewArgs;

/// Reconcile quiz exports into an attendance store.
///
/// Reads the participant list of a quiz export, matches each participant to a
/// long-lived attendee record, registers the session and logs attendance.
#[derive(Debug, Parser)]
#[command(name = "attend", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import a quiz export as one attended session.
    Import(ImportArgs),

    /// Show what an import would do, without touching the store.
    Preview(PreviewArgs),

    /// Show row counts of the attendance tables.
    Status,
}
