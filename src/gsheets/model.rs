use crate::a1::CellCoordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A single primitive cell value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Formula text is any string value starting with `=`.
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Text(text) if text.starts_with('='))
    }
}

/// Whole numbers serialize as JSON integers (`30`, not `30.0`).
impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Boolean(b) => serializer.serialize_bool(*b),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serializer.serialize_i64(*n as i64)
            }
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

/// Rows of cells. Rows may differ in length.
pub type Grid = Vec<Vec<CellValue>>;

/// Rows and columns of the smallest rectangle holding every cell of `grid`.
pub fn bounding_box(grid: &Grid) -> (u32, u32) {
    let rows = grid.len() as u32;
    let columns = grid.iter().map(Vec::len).max().unwrap_or(0) as u32;
    if columns == 0 {
        (0, 0)
    } else {
        (rows, columns)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    #[serde(default)]
    pub bold_header: bool,
    #[serde(default)]
    pub freeze_header_row: bool,
    #[serde(default)]
    pub basic_filter: bool,
}

impl FormatOptions {
    pub fn any(&self) -> bool {
        self.bold_header || self.freeze_header_row || self.basic_filter
    }
}

/// A formula to write verbatim at a decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaCell {
    pub reference: String,
    pub coordinate: CellCoordinate,
    pub formula: String,
}

/// A validated create request.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRequest {
    pub title: String,
    pub data: Grid,
    pub formulas: Vec<FormulaCell>,
    pub share_with: Option<String>,
    pub format_options: FormatOptions,
}

/// A validated update request.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub spreadsheet_id: String,
    pub worksheet_name: Option<String>,
    pub data: Grid,
    pub formulas: Vec<FormulaCell>,
    pub format_options: FormatOptions,
    pub clear_existing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub spreadsheet_id: String,
    pub worksheet_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub title_contains: Option<String>,
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub filter: ListFilter,
    pub page_token: Option<String>,
    pub page_size: u32,
}

/// Identity of a remote spreadsheet, as returned by create or lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetHandle {
    pub id: String,
    pub url: String,
    /// Numeric id of the worksheet (tab) operations target.
    pub sheet_id: i64,
    /// Title of the worksheet operations target.
    pub sheet_title: String,
}

pub fn spreadsheet_url(id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{}", id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetPage {
    pub entries: Vec<SheetEntry>,
    pub next_page_token: Option<String>,
}
