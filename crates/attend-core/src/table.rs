//! Logical tables of the attendance store and the shapes of their rows.

use std::fmt;

use crate::types::{AttendeeId, SessionId};

/// The three tables every backend must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Attendees,
    Sessions,
    AttendanceLog,
}

impl Table {
    pub const ALL: [Self; 3] = [Self::Attendees, Self::Sessions, Self::AttendanceLog];

    /// Canonical table name, also the default tab name in remote stores.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attendees => "attendees",
            Self::Sessions => "sessions",
            Self::AttendanceLog => "attendance_log",
        }
    }

    /// Column headers, in storage order.
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Attendees => &["id", "name", "email"],
            Self::Sessions => &["id", "url", "title", "date"],
            Self::AttendanceLog => &["attendee_id", "session_id"],
        }
    }

    /// Position of the store-assigned identifier column, if the table has one.
    pub const fn id_column(self) -> Option<usize> {
        match self {
            Self::Attendees | Self::Sessions => Some(0),
            Self::AttendanceLog => None,
        }
    }

    /// Position of a named column.
    pub fn column_index(self, name: &str) -> Option<usize> {
        self.columns().iter().position(|column| *column == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A value written into a single cell.
///
/// `Empty` in an identifier column asks the store to assign the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Empty,
    Text(String),
    Integer(i64),
}

impl CellValue {
    /// Renders the value the way it reads back from a text-only store.
    pub fn render(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(text) => text.clone(),
            Self::Integer(value) => value.to_string(),
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<AttendeeId> for CellValue {
    fn from(id: AttendeeId) -> Self {
        Self::Integer(id.get())
    }
}

impl From<SessionId> for CellValue {
    fn from(id: SessionId) -> Self {
        Self::Integer(id.get())
    }
}

/// One data row, keyed by header.
///
/// Cells beyond the end of a short row read as empty strings, matching how
/// spreadsheet APIs trim trailing blanks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Pairs each header with the cell at the same position.
    pub fn from_row<H: AsRef<str>, C: AsRef<str>>(headers: &[H], row: &[C]) -> Self {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let value = row.get(idx).map_or("", AsRef::as_ref);
                (header.as_ref().to_string(), value.to_string())
            })
            .collect();
        Self { fields }
    }

    /// Returns the cell under `column`, or `""` when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.fields
            .iter()
            .find(|(header, _)| header == column)
            .map_or("", |(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_canonical_name() {
        let names: Vec<String> = Table::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["attendees", "sessions", "attendance_log"]);
    }

    #[test]
    fn id_columns_point_at_id_header() {
        assert_eq!(Table::Attendees.id_column(), Table::Attendees.column_index("id"));
        assert_eq!(Table::Sessions.id_column(), Table::Sessions.column_index("id"));
        assert_eq!(Table::AttendanceLog.id_column(), None);
    }

    #[test]
    fn record_pads_short_rows() {
        let record = Record::from_row(Table::Attendees.columns(), &["7", "Ana Lee"]);
        assert_eq!(record.get("id"), "7");
        assert_eq!(record.get("name"), "Ana Lee");
        assert_eq!(record.get("email"), "");
        assert_eq!(record.get("missing"), "");
    }

    #[test]
    fn cell_value_from_empty_string_is_empty() {
        assert_eq!(CellValue::from(""), CellValue::Empty);
        assert_eq!(CellValue::from(42).render(), "42");
    }
}
