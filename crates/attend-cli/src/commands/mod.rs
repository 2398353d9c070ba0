//! CLI subcommand implementations.

pub mod import;
pub mod plan;
pub mod preview;
pub mod status;
