//! # Backend Layer
//!
//! The [`SheetsBackend`] trait is the capability the core is handed at startup: an
//! already-authenticated client for the remote spreadsheet service. Commands never
//! construct one and never reach one through globals; the API facade owns it and
//! lends it to each invocation.
//!
//! ## Implementations
//!
//! - [`http::HttpBackend`]: Google Sheets v4 and Drive v3 over HTTPS
//!   - Bearer-token authentication; the token is minted by the caller
//!   - Maps HTTP status codes onto [`SheetsError`](crate::error::SheetsError) kinds
//!
//! - [`memory::InMemoryBackend`]: In-memory spreadsheets for testing
//!   - Records every call by name
//!   - Can be scripted to fail specific calls a number of times
//!
//! ## Worksheet Handles
//!
//! Every mutating call takes a [`SpreadsheetHandle`], obtained from
//! `create_spreadsheet` or `open_spreadsheet`. It names both the spreadsheet and
//! the single worksheet (tab) the request targets.

use crate::a1::CellCoordinate;
use crate::error::Result;
use crate::model::{FormatOptions, Grid, ListFilter, SheetPage, SpreadsheetHandle};

pub mod http;
pub mod memory;

/// Permission granted when sharing a spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareRole {
    Reader,
    Commenter,
    Writer,
}

impl ShareRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareRole::Reader => "reader",
            ShareRole::Commenter => "commenter",
            ShareRole::Writer => "writer",
        }
    }
}

impl std::str::FromStr for ShareRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "reader" => Ok(ShareRole::Reader),
            "commenter" => Ok(ShareRole::Commenter),
            "writer" => Ok(ShareRole::Writer),
            other => Err(format!("Unknown share role: {}", other)),
        }
    }
}

/// Abstract interface to the remote spreadsheet service.
///
/// Implementations perform exactly one remote request per call and report
/// failures with the kind that best describes them; retrying is the caller's job.
pub trait SheetsBackend {
    /// Create a spreadsheet and return a handle on its first worksheet
    fn create_spreadsheet(&mut self, title: &str) -> Result<SpreadsheetHandle>;

    /// Look up an existing spreadsheet, targeting the named worksheet or the first one
    fn open_spreadsheet(&self, id: &str, worksheet: Option<&str>) -> Result<SpreadsheetHandle>;

    /// Remove all values from the worksheet
    fn clear_values(&mut self, sheet: &SpreadsheetHandle) -> Result<()>;

    /// Write `rows` starting at `origin`, interpreting text as if typed by a user
    fn write_range(
        &mut self,
        sheet: &SpreadsheetHandle,
        origin: CellCoordinate,
        rows: &Grid,
    ) -> Result<()>;

    /// Write one cell's text verbatim (formulas included)
    fn write_cell(
        &mut self,
        sheet: &SpreadsheetHandle,
        cell: CellCoordinate,
        text: &str,
    ) -> Result<()>;

    /// Apply formatting; `extent` is the (rows, columns) of written data, if known
    fn apply_formatting(
        &mut self,
        sheet: &SpreadsheetHandle,
        options: FormatOptions,
        extent: Option<(u32, u32)>,
    ) -> Result<()>;

    /// Grant `email` access to the spreadsheet
    fn share(&mut self, sheet: &SpreadsheetHandle, email: &str, role: ShareRole) -> Result<()>;

    /// All populated rows of the worksheet
    fn read_values(&self, sheet: &SpreadsheetHandle) -> Result<Grid>;

    /// One page of accessible spreadsheets
    fn list_spreadsheets(
        &self,
        filter: &ListFilter,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<SheetPage>;
}
