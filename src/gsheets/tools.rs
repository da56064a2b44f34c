//! Tool descriptors for the protocol transport.
//!
//! The transport advertises these to the assistant and routes calls back to
//! [`SheetsApi::call_tool`](crate::api::SheetsApi::call_tool) by name.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    CreateGoogleSheet,
    UpdateGoogleSheet,
    GetGoogleSheet,
    ListGoogleSheets,
}

impl Tool {
    pub const ALL: [Tool; 4] = [
        Tool::CreateGoogleSheet,
        Tool::UpdateGoogleSheet,
        Tool::GetGoogleSheet,
        Tool::ListGoogleSheets,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::CreateGoogleSheet => "create_google_sheet",
            Tool::UpdateGoogleSheet => "update_google_sheet",
            Tool::GetGoogleSheet => "get_google_sheet",
            Tool::ListGoogleSheets => "list_google_sheets",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::CreateGoogleSheet => {
                "Create a Google Sheet with the given data, formulas and formatting, optionally sharing it."
            }
            Tool::UpdateGoogleSheet => {
                "Write data, formulas and formatting into an existing Google Sheet."
            }
            Tool::GetGoogleSheet => "Read all populated rows of a Google Sheet.",
            Tool::ListGoogleSheets => "List accessible Google Sheets, with optional filters and paging.",
        }
    }

    pub fn input_schema(&self) -> Value {
        let cell = json!({ "type": ["string", "number", "boolean"] });
        let grid = json!({ "type": "array", "items": { "type": "array", "items": cell } });
        let formulas = json!({
            "type": "object",
            "description": "Map of A1 cell reference to formula text, e.g. {\"B4\": \"=SUM(B2:B3)\"}",
            "additionalProperties": { "type": "string" }
        });
        let format_options = json!({
            "type": "array",
            "items": { "enum": ["bold_header", "freeze_header_row", "basic_filter"] }
        });
        let spreadsheet_id = json!({
            "type": "string",
            "description": "Spreadsheet id or full spreadsheet URL"
        });

        let id_required = json!([
            { "required": ["spreadsheet_id"] },
            { "required": ["spreadsheet_url"] }
        ]);

        match self {
            Tool::CreateGoogleSheet => json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "data": grid,
                    "formulas": formulas,
                    "share_with": { "type": "string", "format": "email" },
                    "format_options": format_options
                },
                "required": ["title", "data"],
                "additionalProperties": false
            }),
            Tool::UpdateGoogleSheet => json!({
                "type": "object",
                "properties": {
                    "spreadsheet_id": spreadsheet_id,
                    "spreadsheet_url": { "type": "string", "description": "Alias of spreadsheet_id" },
                    "worksheet_name": { "type": "string" },
                    "data": grid,
                    "formulas": formulas,
                    "format_options": format_options,
                    "clear_existing": { "type": "boolean" }
                },
                "anyOf": id_required,
                "additionalProperties": false
            }),
            Tool::GetGoogleSheet => json!({
                "type": "object",
                "properties": {
                    "spreadsheet_id": spreadsheet_id,
                    "spreadsheet_url": { "type": "string", "description": "Alias of spreadsheet_id" },
                    "worksheet_name": { "type": "string" }
                },
                "anyOf": id_required,
                "additionalProperties": false
            }),
            Tool::ListGoogleSheets => json!({
                "type": "object",
                "properties": {
                    "title_contains": { "type": "string" },
                    "folder_id": { "type": "string" },
                    "page_token": { "type": "string" },
                    "page_size": { "type": "integer", "minimum": 1 }
                },
                "additionalProperties": false
            }),
        }
    }

    pub fn definition(&self) -> ToolDef {
        ToolDef {
            name: self.name(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("Unknown tool: {}", s))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

pub fn definitions() -> Vec<ToolDef> {
    Tool::ALL.iter().map(Tool::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for tool in Tool::ALL {
            assert_eq!(tool.name().parse::<Tool>().unwrap(), tool);
        }
        assert!("drop_google_sheet".parse::<Tool>().is_err());
    }

    #[test]
    fn definitions_serialize_with_schema() {
        let defs = serde_json::to_value(definitions()).unwrap();
        assert_eq!(defs.as_array().unwrap().len(), 4);
        assert_eq!(defs[0]["name"], "create_google_sheet");
        assert_eq!(defs[0]["inputSchema"]["required"], json!(["title", "data"]));
        assert!(defs[3]["inputSchema"].get("required").is_none());
        for def in defs.as_array().unwrap() {
            assert_eq!(def["inputSchema"]["additionalProperties"], json!(false));
        }
        for def in &defs.as_array().unwrap()[1..3] {
            assert!(def["inputSchema"]["properties"].get("spreadsheet_url").is_some());
            assert_eq!(def["inputSchema"]["anyOf"].as_array().unwrap().len(), 2);
        }
    }
}
