//! # Request Validation
//!
//! Tool arguments arrive as loosely typed JSON. This module is the only place that
//! turns them into typed requests; everything downstream works on [`SheetRequest`]
//! and friends. Checks short-circuit on the first failure and never touch the
//! backend.

use crate::a1;
use crate::error::{Result, SheetsError};
use crate::model::{
    CellValue, FormatOptions, FormulaCell, GetRequest, Grid, ListFilter, ListRequest,
    SheetRequest, UpdateRequest,
};
use serde_json::{Map, Value};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

type Args = Map<String, Value>;

const CREATE_ARGS: &[&str] = &["title", "data", "formulas", "share_with", "format_options"];
const UPDATE_ARGS: &[&str] = &[
    "spreadsheet_id",
    "spreadsheet_url",
    "worksheet_name",
    "data",
    "formulas",
    "format_options",
    "clear_existing",
];
const GET_ARGS: &[&str] = &["spreadsheet_id", "spreadsheet_url", "worksheet_name"];
const LIST_ARGS: &[&str] = &["title_contains", "folder_id", "page_token", "page_size"];

fn as_object(args: &Value) -> Result<&Args> {
    args.as_object()
        .ok_or_else(|| SheetsError::invalid("arguments", "expected a JSON object"))
}

/// Treats JSON `null` the same as an absent key.
fn field<'a>(args: &'a Args, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

pub fn validate_create(args: &Value) -> Result<SheetRequest> {
    let args = as_object(args)?;

    let title = match field(args, "title") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => return Err(SheetsError::MissingField("title".into())),
    };
    let data = match field(args, "data") {
        Some(value) => parse_grid(value)?,
        None => return Err(SheetsError::invalid("data", "is required")),
    };
    let formulas = parse_formulas(field(args, "formulas"))?;
    let share_with = parse_email(field(args, "share_with"))?;
    let format_options = parse_format_options(args)?;
    reject_unknown(args, CREATE_ARGS)?;

    Ok(SheetRequest {
        title,
        data,
        formulas,
        share_with,
        format_options,
    })
}

pub fn validate_update(args: &Value) -> Result<UpdateRequest> {
    let args = as_object(args)?;

    let spreadsheet_id = parse_spreadsheet_id(args)?;
    let data = match field(args, "data") {
        Some(value) => parse_grid(value)?,
        None => Vec::new(),
    };
    let formulas = parse_formulas(field(args, "formulas"))?;
    let format_options = parse_format_options(args)?;
    let worksheet_name = optional_string(args, "worksheet_name")?;
    let clear_existing = optional_bool(args, "clear_existing")?.unwrap_or(false);
    reject_unknown(args, UPDATE_ARGS)?;

    Ok(UpdateRequest {
        spreadsheet_id,
        worksheet_name,
        data,
        formulas,
        format_options,
        clear_existing,
    })
}

pub fn validate_get(args: &Value) -> Result<GetRequest> {
    let args = as_object(args)?;
    let request = GetRequest {
        spreadsheet_id: parse_spreadsheet_id(args)?,
        worksheet_name: optional_string(args, "worksheet_name")?,
    };
    reject_unknown(args, GET_ARGS)?;
    Ok(request)
}

pub fn validate_list(args: &Value, default_page_size: u32) -> Result<ListRequest> {
    // `list_google_sheets` takes no required arguments
    let empty = Map::new();
    let args = match args {
        Value::Null => &empty,
        other => as_object(other)?,
    };

    let page_size = match field(args, "page_size") {
        None => default_page_size,
        Some(value) => match value.as_i64() {
            Some(n) if n > 0 => u32::try_from(n)
                .map_err(|_| SheetsError::invalid("page_size", "is too large"))?,
            Some(_) => return Err(SheetsError::invalid("page_size", "must be positive")),
            None => return Err(SheetsError::invalid("page_size", "must be an integer")),
        },
    };

    let request = ListRequest {
        filter: ListFilter {
            title_contains: optional_string(args, "title_contains")?,
            folder_id: optional_string(args, "folder_id")?,
        },
        page_token: optional_string(args, "page_token")?,
        page_size,
    };
    reject_unknown(args, LIST_ARGS)?;
    Ok(request)
}

fn parse_grid(value: &Value) -> Result<Grid> {
    let rows = value
        .as_array()
        .ok_or_else(|| SheetsError::invalid("data", "expected a list of rows"))?;

    rows.iter()
        .enumerate()
        .map(|(r, row)| {
            let cells = row.as_array().ok_or_else(|| {
                SheetsError::invalid("data", format!("row {} is not a list", r + 1))
            })?;
            cells
                .iter()
                .enumerate()
                .map(|(c, cell)| parse_cell(cell, r, c))
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

fn parse_cell(value: &Value, row: usize, column: usize) -> Result<CellValue> {
    match value {
        Value::String(s) => Ok(CellValue::Text(s.clone())),
        Value::Bool(b) => Ok(CellValue::Boolean(*b)),
        Value::Number(n) => n.as_f64().map(CellValue::Number).ok_or_else(|| {
            SheetsError::invalid("data", format!("number out of range at row {}", row + 1))
        }),
        _ => Err(SheetsError::invalid(
            "data",
            format!(
                "cell {} must be a string, number or boolean",
                a1::encode(a1::CellCoordinate {
                    row: row as u32 + 1,
                    column: column as u32 + 1,
                })
            ),
        )),
    }
}

/// Formulas sorted by row, then column.
fn parse_formulas(value: Option<&Value>) -> Result<Vec<FormulaCell>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let map = value
        .as_object()
        .ok_or_else(|| SheetsError::invalid("formulas", "expected a mapping of cell to formula"))?;

    let mut formulas = map
        .iter()
        .map(|(reference, formula)| {
            let coordinate = a1::decode(reference).map_err(|_| {
                SheetsError::invalid("formulas", format!("'{}' is not an A1 reference", reference))
            })?;
            let formula = formula.as_str().ok_or_else(|| {
                SheetsError::invalid("formulas", format!("formula for {} must be text", reference))
            })?;
            Ok(FormulaCell {
                reference: reference.clone(),
                coordinate,
                formula: formula.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    formulas.sort_by_key(|f| (f.coordinate.row, f.coordinate.column));
    Ok(formulas)
}

fn parse_email(value: Option<&Value>) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let email = value
        .as_str()
        .ok_or_else(|| SheetsError::invalid("share_with", "expected an email address"))?;

    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => {
            Ok(Some(email.to_string()))
        }
        _ => Err(SheetsError::invalid(
            "share_with",
            format!("'{}' is not an email address", email),
        )),
    }
}

/// Accepts `format_options` as either a list of flag names or an object of booleans.
fn parse_format_options(args: &Args) -> Result<FormatOptions> {
    let mut options = FormatOptions::default();
    let Some(value) = field(args, "format_options") else {
        return Ok(options);
    };

    let bad = |what: &str| SheetsError::invalid("format_options", what.to_string());
    match value {
        Value::Array(flags) => {
            for flag in flags {
                match flag.as_str() {
                    Some("bold_header") => options.bold_header = true,
                    Some("freeze_header_row") => options.freeze_header_row = true,
                    Some("basic_filter") => options.basic_filter = true,
                    Some(other) => return Err(bad(&format!("unknown flag '{}'", other))),
                    None => return Err(bad("flags must be strings")),
                }
            }
        }
        Value::Object(_) => {
            options = serde_json::from_value(value.clone())
                .map_err(|e| bad(&format!("{}", e)))?;
        }
        _ => return Err(bad("expected a list of flags")),
    }
    Ok(options)
}

/// Accepts a bare id or a full `.../spreadsheets/d/<id>/...` URL.
fn parse_spreadsheet_id(args: &Args) -> Result<String> {
    let raw = match field(args, "spreadsheet_id").or_else(|| field(args, "spreadsheet_url")) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim(),
        Some(_) => return Err(SheetsError::invalid("spreadsheet_id", "expected text")),
        None => return Err(SheetsError::MissingField("spreadsheet_id".into())),
    };
    extract_spreadsheet_id(raw)
        .ok_or_else(|| SheetsError::invalid("spreadsheet_id", format!("cannot read an id from '{}'", raw)))
}

pub fn extract_spreadsheet_id(raw: &str) -> Option<String> {
    let id = match raw.split_once("/spreadsheets/d/") {
        Some((_, rest)) => rest.split(['/', '?', '#']).next().unwrap_or_default(),
        None => raw,
    };
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then(|| id.to_string())
}

/// Unrecognized keys fail loudly instead of being dropped.
fn reject_unknown(args: &Args, allowed: &[&str]) -> Result<()> {
    match args.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(SheetsError::invalid(
            key.as_str(),
            format!("unknown argument; expected one of: {}", allowed.join(", ")),
        )),
        None => Ok(()),
    }
}

fn optional_string(args: &Args, name: &str) -> Result<Option<String>> {
    match field(args, name) {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SheetsError::invalid(name, "expected text")),
    }
}

fn optional_bool(args: &Args, name: &str) -> Result<Option<bool>> {
    match field(args, name) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(SheetsError::invalid(name, "expected true or false")),
    }
}
