//! Status command for showing how much the attendance store holds.

use std::io::Write;

use anyhow::{Context, Result};
use attend_core::{Table, TableStore};

use crate::{Config, store};

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let mut store = store::open(config)?;
    write_counts(writer, store.as_mut(), &store::describe(config))
}

fn write_counts<W: Write, S: TableStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    location: &str,
) -> Result<()> {
    writeln!(writer, "Attendance store: {location}")?;
    for table in Table::ALL {
        let rows = store
            .read_all(table)
            .with_context(|| format!("failed to read {table}"))?;
        writeln!(writer, "- {table}: {}", rows.len())?;
    }
    Ok(())
}
