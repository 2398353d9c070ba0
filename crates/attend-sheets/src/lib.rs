//! Google Sheets backend for the attendance tables.
//!
//! Each [`Table`] lives in its own tab of one spreadsheet. The first row of a
//! tab is its header; data rows follow. Ids are filled in by whatever the
//! spreadsheet owner has set up (a formula or an Apps Script trigger), which
//! is why the engine polls for them.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use attend_core::{CellValue, Record, StoreError, Table, TableStore};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sheets backend errors.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("invalid access token: {reason}")]
    InvalidToken { reason: &'static str },
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{base} cannot carry a path")]
    BaseUrl { base: String },
    /// Google returned a non-success status.
    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// A configured tab does not exist in the spreadsheet.
    #[error("spreadsheet has no tab named {tab:?}")]
    MissingTab { tab: String },
}

impl From<SheetsError> for StoreError {
    fn from(err: SheetsError) -> Self {
        Self::backend(err)
    }
}

/// Tab names for each table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNames {
    pub attendees: String,
    pub sessions: String,
    pub attendance_log: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            attendees: "attendees".to_string(),
            sessions: "sessions".to_string(),
            attendance_log: "attendee_log".to_string(),
        }
    }
}

impl SheetNames {
    pub fn tab(&self, table: Table) -> &str {
        match table {
            Table::Attendees => &self.attendees,
            Table::Sessions => &self.sessions,
            Table::AttendanceLog => &self.attendance_log,
        }
    }
}

/// Connection settings for [`SheetsStore::connect`].
#[derive(Clone)]
pub struct SheetsSettings {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub access_token: String,
    pub names: SheetNames,
}

impl fmt::Debug for SheetsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetsSettings")
            .field("base_url", &self.base_url)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("access_token", &"[REDACTED]")
            .field("names", &self.names)
            .finish()
    }
}

/// A spreadsheet holding the three attendance tabs.
pub struct SheetsStore {
    http: reqwest::blocking::Client,
    base: Url,
    spreadsheet_id: String,
    access_token: String,
    names: SheetNames,
    /// Header row per table, as seen by the last read.
    headers: HashMap<Table, Vec<String>>,
    /// Data row count per table, as seen by the last read.
    row_counts: HashMap<Table, usize>,
}

impl fmt::Debug for SheetsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetsStore")
            .field("base", &self.base.as_str())
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsStore {
    /// Opens the spreadsheet and checks that every configured tab exists.
    pub fn connect(settings: SheetsSettings) -> Result<Self, SheetsError> {
        if settings.access_token.trim().is_empty() {
            return Err(SheetsError::InvalidToken {
                reason: "access token cannot be empty",
            });
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(SheetsError::ClientBuild)?;
        let base = Url::parse(&settings.base_url)?;
        if base.cannot_be_a_base() {
            return Err(SheetsError::BaseUrl {
                base: settings.base_url,
            });
        }

        let store = Self {
            http,
            base,
            spreadsheet_id: settings.spreadsheet_id,
            access_token: settings.access_token,
            names: settings.names,
            headers: HashMap::new(),
            row_counts: HashMap::new(),
        };
        store.check_tabs()?;
        info!(spreadsheet = %store.spreadsheet_id, "connected to spreadsheet");
        Ok(store)
    }

    fn check_tabs(&self) -> Result<(), SheetsError> {
        let mut url = self.endpoint(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");
        let body = self.send(self.http.get(url))?;
        let meta: SpreadsheetMeta = parse_body(&body)?;

        let titles: Vec<&str> = meta
            .sheets
            .iter()
            .map(|sheet| sheet.properties.title.as_str())
            .collect();
        for table in Table::ALL {
            let tab = self.names.tab(table);
            if !titles.contains(&tab) {
                return Err(SheetsError::MissingTab {
                    tab: tab.to_string(),
                });
            }
        }
        Ok(())
    }

    /// `{base}/v4/spreadsheets/{id}/values/...`
    fn endpoint(&self, values_path: &[&str]) -> Result<Url, SheetsError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| SheetsError::BaseUrl {
                base: self.base.to_string(),
            })?;
            segments
                .pop_if_empty()
                .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()]);
            if !values_path.is_empty() {
                segments.push("values").extend(values_path);
            }
        }
        Ok(url)
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<String, SheetsError> {
        let response = request.bearer_auth(&self.access_token).send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message: parse_api_error(&body).unwrap_or(body),
            });
        }
        Ok(body)
    }

    fn read_tab(&mut self, table: Table) -> Result<Vec<Record>, SheetsError> {
        let range = quote_tab(self.names.tab(table));
        let mut url = self.endpoint(&[&range])?;
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE");
        let body = self.send(self.http.get(url))?;
        let payload: ValueRange = parse_body(&body)?;

        let mut rows = payload.values.into_iter();
        let headers: Vec<String> = rows
            .next()
            .unwrap_or_default()
            .iter()
            .map(|cell| cell_text(cell).trim().to_lowercase())
            .collect();
        let records: Vec<Record> = rows
            .map(|row| {
                let cells: Vec<String> = row.iter().map(cell_text).collect();
                Record::from_row(&headers, &cells)
            })
            .collect();

        debug!(%table, rows = records.len(), "read tab");
        self.headers.insert(table, headers);
        self.row_counts.insert(table, records.len());
        Ok(records)
    }

    fn append_values(&self, table: Table, values: &[CellValue]) -> Result<(), SheetsError> {
        let range = format!("{}!A1:append", quote_tab(self.names.tab(table)));
        let mut url = self.endpoint(&[&range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let row: Vec<Value> = values.iter().map(cell_json).collect();
        self.send(self.http.post(url).json(&json!({ "values": [row] })))?;
        debug!(%table, "appended row");
        Ok(())
    }

    fn write_cell(
        &self,
        table: Table,
        row: usize,
        column: usize,
        value: &CellValue,
    ) -> Result<(), SheetsError> {
        // Data row 0 sits under the header, on sheet row 2.
        let cell = format!("{}{}", column_letter(column), row + 2);
        let range = format!("{}!{cell}", quote_tab(self.names.tab(table)));
        let mut url = self.endpoint(&[&range])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = json!({ "range": range, "values": [[cell_json(value)]] });
        self.send(self.http.put(url).json(&body))?;
        debug!(%table, %cell, "updated cell");
        Ok(())
    }

    /// Sheet column for `table.columns()[column]`, following the header row
    /// when the tab orders its columns differently.
    fn sheet_column(&self, table: Table, column: usize) -> usize {
        let name = table.columns()[column];
        self.headers
            .get(&table)
            .and_then(|headers| headers.iter().position(|header| header == name))
            .unwrap_or(column)
    }
}

impl TableStore for SheetsStore {
    fn read_all(&mut self, table: Table) -> Result<Vec<Record>, StoreError> {
        Ok(self.read_tab(table)?)
    }

    fn append_row(&mut self, table: Table, values: &[CellValue]) -> Result<(), StoreError> {
        let expected = table.columns().len();
        if values.len() != expected {
            return Err(StoreError::RowWidth {
                table,
                expected,
                actual: values.len(),
            });
        }
        self.append_values(table, values)?;
        if let Some(count) = self.row_counts.get_mut(&table) {
            *count += 1;
        }
        Ok(())
    }

    fn update_cell(
        &mut self,
        table: Table,
        row: usize,
        column: usize,
        value: &CellValue,
    ) -> Result<(), StoreError> {
        if column >= table.columns().len() {
            return Err(StoreError::ColumnOutOfRange { table, column });
        }
        if self.row_counts.get(&table).is_some_and(|count| row >= *count) {
            return Err(StoreError::RowOutOfRange { table, row });
        }
        let sheet_column = self.sheet_column(table, column);
        Ok(self.write_cell(table, row, sheet_column, value)?)
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, SheetsError> {
    serde_json::from_str(body).map_err(|err| SheetsError::InvalidResponse(err.to_string()))
}

fn parse_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| payload.error.message)
}

/// A1 notation needs quotes around tab names that are not plain words.
fn quote_tab(tab: &str) -> String {
    if !tab.is_empty() && tab.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        tab.to_string()
    } else {
        format!("'{}'", tab.replace('\'', "''"))
    }
}

/// 0-based column index to its A1 letters: 0 → A, 25 → Z, 26 → AA.
fn column_letter(column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn cell_json(value: &CellValue) -> Value {
    match value {
        CellValue::Empty => json!(""),
        CellValue::Text(text) => json!(text),
        CellValue::Integer(number) => json!(number),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        // Whole numbers read back as ids, not `1234.0`.
        Value::Number(number) => number
            .as_f64()
            .filter(|value| value.fract().abs() < f64::EPSILON && value.abs() < 9e15)
            .map_or_else(|| number.to_string(), |value| format!("{value:.0}")),
        other => other.to_string(),
    }
}
