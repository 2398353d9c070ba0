//! Opening the configured attendance store.

use anyhow::{Context, Result};
use attend_core::TableStore;
use attend_db::Database;
use attend_sheets::SheetsStore;

use crate::{Backend, Config};

/// Opens the backend selected by `config`.
///
/// For sqlite the parent directory of the database is created if needed.
pub fn open(config: &Config) -> Result<Box<dyn TableStore>> {
    match config.backend {
        Backend::Sqlite => {
            if let Some(parent) = config.database_path.parent() {
                std::fs::create_dir_all(parent).context("failed to create database directory")?;
            }
            let db = Database::open(&config.database_path).with_context(|| {
                format!("failed to open {}", config.database_path.display())
            })?;
            Ok(Box::new(db))
        }
        Backend::Sheets => {
            let store = SheetsStore::connect(config.sheets_settings())
                .context("failed to connect to the spreadsheet")?;
            Ok(Box::new(store))
        }
    }
}

/// One-line description of where the data lives.
pub fn describe(config: &Config) -> String {
    match config.backend {
        Backend::Sqlite => format!("sqlite ({})", config.database_path.display()),
        Backend::Sheets => format!(
            "sheets ({})",
            config.sheets.spreadsheet_id.as_deref().unwrap_or_default()
        ),
    }
}
