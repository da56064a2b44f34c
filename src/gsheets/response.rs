//! Uniform response envelope returned by every tool.
//!
//! ```json
//! {"status": "success", "message": "Spreadsheet created successfully", "url": "https://..."}
//! {"status": "error", "message": "NotFound: Not found: spreadsheet abc"}
//! ```

use crate::commands::CmdResult;
use crate::error::{FailureRecord, Result, SheetsError};
use crate::model::{Grid, SheetEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Grid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheets: Option<Vec<SheetEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(result: CmdResult) -> Self {
        Self {
            status: Status::Success,
            message: result.summary,
            url: result.spreadsheet.map(|s| s.url),
            data: result.data,
            sheets: result.sheets,
            next_page_token: result.next_page_token,
        }
    }

    /// Message is `"<Kind>: <description>"`. A partially applied mutation keeps
    /// the URL of the spreadsheet it touched.
    pub fn failure(err: &SheetsError) -> Self {
        let record = FailureRecord::from(err);
        Self {
            status: Status::Error,
            message: format!("{}: {}", record.kind, record.message),
            url: err.partial_url().map(str::to_string),
            data: None,
            sheets: None,
            next_page_token: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// JSON object form, as handed to the transport.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "status": "error", "message": format!("RemoteError: {}", e) })
        })
    }
}

pub fn normalize(outcome: Result<CmdResult>) -> ResponseEnvelope {
    match outcome {
        Ok(result) => ResponseEnvelope::success(result),
        Err(err) => ResponseEnvelope::failure(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, SpreadsheetHandle};
    use serde_json::json;

    #[test]
    fn success_serializes_only_present_fields() {
        let result = CmdResult::default()
            .with_summary("Spreadsheet created successfully")
            .with_spreadsheet(SpreadsheetHandle {
                id: "abc".into(),
                url: "https://docs.google.com/spreadsheets/d/abc".into(),
                sheet_id: 0,
                sheet_title: "Sheet1".into(),
            });
        let value = normalize(Ok(result)).to_value();
        assert_eq!(
            value,
            json!({
                "status": "success",
                "message": "Spreadsheet created successfully",
                "url": "https://docs.google.com/spreadsheets/d/abc"
            })
        );
    }

    #[test]
    fn data_grid_is_plain_json() {
        let result = CmdResult::default().with_summary("ok").with_data(vec![vec![
            CellValue::from("Alice"),
            CellValue::Number(30.0),
            CellValue::Boolean(true),
        ]]);
        let value = normalize(Ok(result)).to_value();
        assert_eq!(value["data"], json!([["Alice", 30, true]]));
    }

    #[test]
    fn empty_grid_is_still_reported() {
        let result = CmdResult::default().with_summary("ok").with_data(Vec::new());
        let value = normalize(Ok(result)).to_value();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"], json!([]));
    }

    #[test]
    fn failures_name_their_kind() {
        let envelope = normalize(Err(SheetsError::MissingField("title".into())));
        assert_eq!(envelope.status, Status::Error);
        assert_eq!(envelope.message, "MissingField: Missing required field: title");
        assert_eq!(
            envelope.to_value(),
            json!({"status": "error", "message": "MissingField: Missing required field: title"})
        );
    }

    #[test]
    fn aborted_failures_keep_url_and_disclose_partial_state() {
        let err = SheetsError::Aborted {
            completed: 2,
            total: 4,
            url: Some("https://docs.google.com/spreadsheets/d/abc".into()),
            source: Box::new(SheetsError::NotFound("worksheet".into())),
        };
        let envelope = ResponseEnvelope::failure(&err);
        assert!(envelope.message.starts_with("NotFound: "));
        assert!(envelope.message.contains("not been rolled back"));
        assert_eq!(
            envelope.url.as_deref(),
            Some("https://docs.google.com/spreadsheets/d/abc")
        );
    }

    #[test]
    fn envelopes_parse_back() {
        let text = r#"{"status":"success","message":"Found 1 spreadsheet","sheets":[{"id":"a","title":"A","url":"u"}]}"#;
        let envelope: ResponseEnvelope = serde_json::from_str(text).unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.sheets.unwrap()[0].title, "A");
    }
}
