//! Quiz export reader.
//!
//! An export workbook carries three sheets we care about:
//! - `Participant Data`: one row per player, `First Name` / `Last Name`.
//! - `Quiz Details`: `Name` / `Value` pairs, including `Game Started On`.
//! - `Overview`: one row per question, one column per player headed
//!   `"<full name> (<score>)"`. The email question's row holds the answers.
//!
//! Each sheet is loaded into a [`Grid`] of display strings so the extraction
//! rules can be exercised without an `.xlsx` on disk.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::types::Email;

pub const PARTICIPANT_SHEET: &str = "Participant Data";
pub const DETAILS_SHEET: &str = "Quiz Details";
pub const OVERVIEW_SHEET: &str = "Overview";

const FIRST_NAME: &str = "First Name";
const LAST_NAME: &str = "Last Name";
const DETAIL_NAME: &str = "Name";
const DETAIL_VALUE: &str = "Value";
const STARTED_ON: &str = "Game Started On";
const QUESTION: &str = "Question";
const LINE_BREAK: &str = "<br>";

/// Format of the `Game Started On` value, after any comma suffix is dropped.
const STARTED_ON_FORMAT: &str = "%a %d %b %Y";

static EMAIL_QUESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)e[-\s]?mail?").expect("email question pattern is valid"));

static PLAYER_COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+\(").expect("player column pattern is valid"));

/// Export reading errors. All of them are fatal to an import.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to open export {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("export has no {0:?} sheet")]
    MissingSheet(&'static str),
    #[error("failed to read sheet {sheet:?}: {source}")]
    Sheet {
        sheet: &'static str,
        #[source]
        source: calamine::Error,
    },
    #[error("sheet {sheet:?} has no {column:?} column")]
    MissingColumn {
        sheet: &'static str,
        column: &'static str,
    },
    #[error("could not find {label:?} in sheet {sheet:?}")]
    MissingRow {
        sheet: &'static str,
        label: &'static str,
    },
    #[error("could not find an email question in sheet {0:?}")]
    MissingEmailQuestion(&'static str),
    #[error("unparseable session date {value:?}")]
    Date {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// A sheet as rows of display strings. The first row is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub const fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Builds a grid from string literals. Handy in tests.
    pub fn from_strs(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                .collect(),
        )
    }

    fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or_default()
    }

    fn column(&self, sheet: &'static str, name: &'static str) -> Result<usize, ExportError> {
        self.optional_column(name)
            .ok_or(ExportError::MissingColumn { sheet, column: name })
    }

    fn optional_column(&self, name: &str) -> Option<usize> {
        self.header().iter().position(|header| header.trim() == name)
    }

    fn data_rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().skip(1).map(Vec::as_slice)
    }
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map_or("", |value| value.trim())
}

/// The three sheets of a quiz export.
#[derive(Debug, Clone, Default)]
pub struct ExportWorkbook {
    pub participants: Grid,
    pub details: Grid,
    pub overview: Grid,
}

impl ExportWorkbook {
    /// Loads the required sheets from an `.xlsx` (or any format calamine reads).
    pub fn open(path: &Path) -> Result<Self, ExportError> {
        let mut workbook = open_workbook_auto(path).map_err(|source| ExportError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let names = workbook.sheet_names().to_vec();

        let mut load = |sheet: &'static str| -> Result<Grid, ExportError> {
            if !names.iter().any(|name| name == sheet) {
                return Err(ExportError::MissingSheet(sheet));
            }
            let range = workbook
                .worksheet_range(sheet)
                .map_err(|source| ExportError::Sheet { sheet, source })?;
            let rows: Vec<Vec<String>> = range
                .rows()
                .map(|row| row.iter().map(cell_to_string).collect())
                .collect();
            debug!(sheet, rows = rows.len(), "loaded export sheet");
            Ok(Grid::new(rows))
        };

        Ok(Self {
            participants: load(PARTICIPANT_SHEET)?,
            details: load(DETAILS_SHEET)?,
            overview: load(OVERVIEW_SHEET)?,
        })
    }

    /// Distinct participant names in sheet order.
    ///
    /// A name is `"<first> <last>"`, or just the first name when the last is
    /// blank. Rows without a first name are skipped.
    pub fn list_participants(&self) -> Result<Vec<String>, ExportError> {
        let grid = &self.participants;
        let first = grid.column(PARTICIPANT_SHEET, FIRST_NAME)?;
        let last = grid.optional_column(LAST_NAME);

        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for row in grid.data_rows() {
            let first_name = cell(row, first);
            if first_name.is_empty() {
                continue;
            }
            let last_name = last.map_or("", |column| cell(row, column));
            let full_name = if last_name.is_empty() {
                first_name.to_string()
            } else {
                format!("{first_name} {last_name}")
            };
            if seen.insert(full_name.clone()) {
                names.push(full_name);
            }
        }
        Ok(names)
    }

    /// The calendar date the quiz was played.
    pub fn extract_session_date(&self) -> Result<NaiveDate, ExportError> {
        let grid = &self.details;
        let name = grid.column(DETAILS_SHEET, DETAIL_NAME)?;
        let value = grid.column(DETAILS_SHEET, DETAIL_VALUE)?;

        let row = grid
            .data_rows()
            .find(|row| cell(row, name) == STARTED_ON)
            .ok_or(ExportError::MissingRow {
                sheet: DETAILS_SHEET,
                label: STARTED_ON,
            })?;
        parse_session_date(cell(row, value))
    }

    /// Validated email per participant name, from the email question's answers.
    ///
    /// Players whose answer is not a usable address are simply absent.
    pub fn extract_email_mapping(&self) -> Result<HashMap<String, Email>, ExportError> {
        let grid = &self.overview;
        let question = grid.column(OVERVIEW_SHEET, QUESTION)?;
        let answers = grid
            .data_rows()
            .find(|row| EMAIL_QUESTION_RE.is_match(cell(row, question)))
            .ok_or(ExportError::MissingEmailQuestion(OVERVIEW_SHEET))?;

        let mut mapping = HashMap::new();
        for (column, header) in grid.header().iter().enumerate() {
            if column == question {
                continue;
            }
            let Some(caps) = PLAYER_COLUMN_RE.captures(header) else {
                continue;
            };
            let name = caps[1].trim().to_string();
            if let Some(email) = extract_email(cell(answers, column)) {
                mapping.insert(name, email);
            }
        }
        Ok(mapping)
    }
}

/// Parses `"<weekday> <day> <month> <year>[, <anything>]"` into a date.
pub fn parse_session_date(raw: &str) -> Result<NaiveDate, ExportError> {
    let date_part = raw.split(',').next().unwrap_or_default().trim();
    NaiveDate::parse_from_str(date_part, STARTED_ON_FORMAT).map_err(|source| ExportError::Date {
        value: raw.to_string(),
        source,
    })
}

/// Pulls a valid address out of an answer cell.
///
/// Answers may carry extra lines separated by `<br>`; the first segment that
/// validates as an email wins.
pub fn extract_email(raw: &str) -> Option<Email> {
    raw.split(LINE_BREAK)
        .map(str::trim)
        .find_map(|segment| Email::parse(segment).ok())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR({e:?})"),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map_or_else(|| dt.to_string(), |value| render_started_on(&value)),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map_or_else(|_| s.clone(), |value| render_started_on(&value)),
    }
}

/// Renders a typed datetime cell the way exports write `Game Started On`.
fn render_started_on(value: &NaiveDateTime) -> String {
    value.format("%a %d %b %Y, %I:%M %p").to_string()
}
