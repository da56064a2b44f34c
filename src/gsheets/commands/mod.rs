use crate::model::{Grid, SheetEntry, SpreadsheetHandle};

pub mod create;
pub mod execute;
pub mod get;
pub mod list;
pub mod update;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Progress or outcome note produced while a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// Success payload of a command.
#[derive(Debug, Default)]
pub struct CmdResult {
    /// One-line summary for the response envelope
    pub summary: String,
    pub spreadsheet: Option<SpreadsheetHandle>,
    pub data: Option<Grid>,
    pub sheets: Option<Vec<SheetEntry>>,
    pub next_page_token: Option<String>,
    /// Operations applied, for mutations
    pub applied: usize,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_spreadsheet(mut self, handle: SpreadsheetHandle) -> Self {
        self.spreadsheet = Some(handle);
        self
    }

    pub fn with_data(mut self, data: Grid) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_sheets(mut self, sheets: Vec<SheetEntry>, next_page_token: Option<String>) -> Self {
        self.sheets = Some(sheets);
        self.next_page_token = next_page_token;
        self
    }
}
