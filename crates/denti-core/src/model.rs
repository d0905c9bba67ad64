use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single untyped table cell as it came out of a PDF, OCR or a spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
    Bool(bool),
}

impl Cell {
    /// Build a cell from extracted text, mapping blank strings to `Empty`.
    pub fn text(s: impl Into<String>) -> Cell {
        let s = s.into();
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// The cell's string form, trimmed. Integral numbers drop the `.0`.
    pub fn text_form(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Date(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    dt.format("%d/%m/%Y").to_string()
                } else {
                    dt.format("%d/%m/%Y %H:%M").to_string()
                }
            }
            Cell::Bool(b) => b.to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text_form())
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

/// One positional row of cells. Column index is the only identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow(pub Vec<Cell>);

impl RawRow {
    pub fn new(cells: Vec<Cell>) -> Self {
        RawRow(cells)
    }

    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        RawRow(texts.iter().map(|s| Cell::text(s.as_ref())).collect())
    }

    pub fn cell(&self, index: usize) -> &Cell {
        self.0.get(index).unwrap_or(&Cell::Empty)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(Cell::is_empty)
    }

    /// Non-empty cells joined by a single space, the way identity lines are matched.
    pub fn joined_text(&self) -> String {
        self.0
            .iter()
            .filter(|c| !c.is_empty())
            .map(Cell::text_form)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of parsing one field: a value, a legitimately blank cell, or a
/// cell that had content but could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseOutcome<T> {
    Parsed(T),
    Absent,
    Malformed(String),
}

impl<T> ParseOutcome<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            ParseOutcome::Parsed(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            ParseOutcome::Parsed(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocTypeCode {
    CC,
    TI,
    CE,
    RC,
    NIT,
}

impl DocTypeCode {
    pub fn from_str_loose(s: &str) -> Option<DocTypeCode> {
        match s.trim().to_uppercase().as_str() {
            "CC" => Some(DocTypeCode::CC),
            "TI" => Some(DocTypeCode::TI),
            "CE" => Some(DocTypeCode::CE),
            "RC" => Some(DocTypeCode::RC),
            "NIT" => Some(DocTypeCode::NIT),
            _ => None,
        }
    }
}

impl fmt::Display for DocTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocTypeCode::CC => "CC",
            DocTypeCode::TI => "TI",
            DocTypeCode::CE => "CE",
            DocTypeCode::RC => "RC",
            DocTypeCode::NIT => "NIT",
        };
        write!(f, "{s}")
    }
}

/// The patient/payer identity line printed above a block of table rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIdentity {
    pub type_code: DocTypeCode,
    /// Digits only.
    pub number: String,
    pub name: String,
}

/// A cell value after normalization, ready to be written to a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutputValue {
    Blank,
    Text(String),
    Number(Decimal),
    Integer(u64),
    Date(NaiveDate),
}

impl OutputValue {
    pub fn text(s: impl Into<String>) -> OutputValue {
        let s = s.into();
        if s.is_empty() {
            OutputValue::Blank
        } else {
            OutputValue::Text(s)
        }
    }

    pub fn date(d: Option<NaiveDate>) -> OutputValue {
        d.map(OutputValue::Date).unwrap_or(OutputValue::Blank)
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputValue::Blank => Ok(()),
            OutputValue::Text(s) => write!(f, "{s}"),
            OutputValue::Number(d) => write!(f, "{d}"),
            OutputValue::Integer(i) => write!(f, "{i}"),
            OutputValue::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
        }
    }
}

/// An uploaded input document.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        InputFile {
            name: name.into(),
            bytes,
        }
    }

    /// Lower-cased extension including the dot, e.g. `".pdf"`; empty when missing.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }
}
