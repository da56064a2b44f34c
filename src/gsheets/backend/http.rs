use super::{SheetsBackend, ShareRole};
use crate::a1::{self, CellCoordinate};
use crate::error::{Result, SheetsError};
use crate::model::{
    bounding_box, spreadsheet_url, FormatOptions, Grid, ListFilter, SheetEntry, SheetPage,
    SpreadsheetHandle,
};
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::RETRY_AFTER;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const SHEETS_API: &str = "https://sheets.googleapis.com/v4/";
pub const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Sheets/Drive client authenticated with an OAuth bearer token.
pub struct HttpBackend {
    client: Client,
    token: Option<String>,
    sheets_base: Url,
    drive_base: Url,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetResource {
    spreadsheet_id: String,
    spreadsheet_url: Option<String>,
    #[serde(default)]
    sheets: Vec<SheetResource>,
}

#[derive(Deserialize)]
struct SheetResource {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Grid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    web_view_link: Option<String>,
    modified_time: Option<DateTime<Utc>>,
}

impl HttpBackend {
    /// A backend without a token fails every call with an authentication error.
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SheetsError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            token,
            sheets_base: parse_base(SHEETS_API)?,
            drive_base: parse_base(DRIVE_API)?,
        })
    }

    /// Point at alternative API roots (e.g. an emulator).
    pub fn with_base_urls(mut self, sheets: &str, drive: &str) -> Result<Self> {
        self.sheets_base = parse_base(sheets)?;
        self.drive_base = parse_base(drive)?;
        Ok(self)
    }

    fn url(&self, base: &Url, segments: &[&str]) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| SheetsError::Config(format!("base URL cannot hold a path: {}", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn sheets_url(&self, segments: &[&str]) -> Result<Url> {
        self.url(&self.sheets_base, segments)
    }

    fn drive_url(&self, segments: &[&str]) -> Result<Url> {
        self.url(&self.drive_base, segments)
    }

    fn send(&self, request: RequestBuilder) -> Result<Value> {
        let token = self.token.as_deref().ok_or_else(|| {
            SheetsError::Authentication("no access token configured".to_string())
        })?;

        let response = request
            .bearer_auth(token)
            .send()
            .map_err(|e| SheetsError::remote(None, e.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response
            .text()
            .map_err(|e| SheetsError::remote(None, e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(error_for_status(status, retry_after, &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn send_as<T: for<'de> Deserialize<'de>>(&self, request: RequestBuilder) -> Result<T> {
        let value = self.send(request)?;
        Ok(serde_json::from_value(value)?)
    }

    fn update_values(&self, sheet: &SpreadsheetHandle, range: &str, rows: &Value) -> Result<()> {
        let range = format!("{}!{}", quote_sheet(&sheet.sheet_title), range);
        let url = self.sheets_url(&["spreadsheets", &sheet.id, "values", &range])?;
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": rows }));
        self.send(request).map(|_| ())
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| SheetsError::Config(format!("invalid API URL '{}': {}", raw, e)))
}

/// Sheet titles are always quoted in ranges: `'Q1 ''24'`.
fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Drive query string literal.
fn quote_query(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn handle_from(resource: SpreadsheetResource, worksheet: Option<&str>) -> Result<SpreadsheetHandle> {
    let id = resource.spreadsheet_id;
    let target = match worksheet {
        Some(name) => resource.sheets.into_iter().find(|s| s.properties.title == name),
        None => resource.sheets.into_iter().next(),
    }
    .ok_or_else(|| {
        SheetsError::NotFound(format!(
            "worksheet {} in spreadsheet {}",
            worksheet.unwrap_or("(first)"),
            id
        ))
    })?;

    Ok(SpreadsheetHandle {
        url: resource
            .spreadsheet_url
            .unwrap_or_else(|| spreadsheet_url(&id)),
        id,
        sheet_id: target.properties.sheet_id,
        sheet_title: target.properties.title,
    })
}

/// Map a non-2xx response onto the failure taxonomy.
pub fn error_for_status(status: u16, retry_after: Option<Duration>, body: &str) -> SheetsError {
    let message = google_error_message(body).unwrap_or_else(|| format!("HTTP {}", status));
    let rate_limit_reason =
        body.contains("rateLimitExceeded") || body.contains("userRateLimitExceeded");

    match status {
        401 => SheetsError::Authentication(message),
        403 if rate_limit_reason => SheetsError::RateLimited {
            message,
            retry_after,
        },
        403 => SheetsError::Authentication(message),
        404 => SheetsError::NotFound(message),
        429 | 503 => SheetsError::RateLimited {
            message,
            retry_after,
        },
        _ => SheetsError::remote(Some(status), message),
    }
}

fn google_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn format_requests(sheet_id: i64, options: FormatOptions, extent: Option<(u32, u32)>) -> Vec<Value> {
    let mut requests = Vec::new();
    if options.bold_header {
        requests.push(json!({
            "repeatCell": {
                "range": { "sheetId": sheet_id, "startRowIndex": 0, "endRowIndex": 1 },
                "cell": { "userEnteredFormat": { "textFormat": { "bold": true } } },
                "fields": "userEnteredFormat.textFormat.bold"
            }
        }));
    }
    if options.freeze_header_row {
        requests.push(json!({
            "updateSheetProperties": {
                "properties": { "sheetId": sheet_id, "gridProperties": { "frozenRowCount": 1 } },
                "fields": "gridProperties.frozenRowCount"
            }
        }));
    }
    if options.basic_filter {
        let mut range = json!({ "sheetId": sheet_id, "startRowIndex": 0, "startColumnIndex": 0 });
        if let Some((rows, columns)) = extent {
            range["endRowIndex"] = json!(rows);
            range["endColumnIndex"] = json!(columns);
        }
        requests.push(json!({ "setBasicFilter": { "filter": { "range": range } } }));
    }
    requests
}

impl SheetsBackend for HttpBackend {
    fn create_spreadsheet(&mut self, title: &str) -> Result<SpreadsheetHandle> {
        let url = self.sheets_url(&["spreadsheets"])?;
        let request = self
            .client
            .post(url)
            .json(&json!({ "properties": { "title": title } }));
        let resource: SpreadsheetResource = self.send_as(request)?;
        handle_from(resource, None)
    }

    fn open_spreadsheet(&self, id: &str, worksheet: Option<&str>) -> Result<SpreadsheetHandle> {
        let url = self.sheets_url(&["spreadsheets", id])?;
        let request = self.client.get(url).query(&[(
            "fields",
            "spreadsheetId,spreadsheetUrl,sheets.properties(sheetId,title)",
        )]);
        let resource: SpreadsheetResource = self.send_as(request)?;
        handle_from(resource, worksheet)
    }

    fn clear_values(&mut self, sheet: &SpreadsheetHandle) -> Result<()> {
        let range = format!("{}:clear", quote_sheet(&sheet.sheet_title));
        let url = self.sheets_url(&["spreadsheets", &sheet.id, "values", &range])?;
        self.send(self.client.post(url).json(&json!({}))).map(|_| ())
    }

    fn write_range(
        &mut self,
        sheet: &SpreadsheetHandle,
        origin: CellCoordinate,
        rows: &Grid,
    ) -> Result<()> {
        let (height, width) = bounding_box(rows);
        let range = a1::range_a1(origin, height, width);
        self.update_values(sheet, &range, &serde_json::to_value(rows)?)
    }

    fn write_cell(
        &mut self,
        sheet: &SpreadsheetHandle,
        cell: CellCoordinate,
        text: &str,
    ) -> Result<()> {
        self.update_values(sheet, &a1::encode(cell), &json!([[text]]))
    }

    fn apply_formatting(
        &mut self,
        sheet: &SpreadsheetHandle,
        options: FormatOptions,
        extent: Option<(u32, u32)>,
    ) -> Result<()> {
        let requests = format_requests(sheet.sheet_id, options, extent);
        if requests.is_empty() {
            return Ok(());
        }
        let target = format!("{}:batchUpdate", sheet.id);
        let url = self.sheets_url(&["spreadsheets", &target])?;
        self.send(self.client.post(url).json(&json!({ "requests": requests })))
            .map(|_| ())
    }

    fn share(&mut self, sheet: &SpreadsheetHandle, email: &str, role: ShareRole) -> Result<()> {
        let url = self.drive_url(&["files", &sheet.id, "permissions"])?;
        let request = self
            .client
            .post(url)
            .query(&[("sendNotificationEmail", "true")])
            .json(&json!({ "type": "user", "role": role.as_str(), "emailAddress": email }));
        self.send(request).map(|_| ())
    }

    fn read_values(&self, sheet: &SpreadsheetHandle) -> Result<Grid> {
        let range = quote_sheet(&sheet.sheet_title);
        let url = self.sheets_url(&["spreadsheets", &sheet.id, "values", &range])?;
        let request = self.client.get(url).query(&[("majorDimension", "ROWS")]);
        let values: ValueRange = self.send_as(request)?;
        Ok(values.values)
    }

    fn list_spreadsheets(
        &self,
        filter: &ListFilter,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<SheetPage> {
        let mut query = format!("mimeType={} and trashed=false", quote_query(SPREADSHEET_MIME));
        if let Some(title) = &filter.title_contains {
            query.push_str(&format!(" and name contains {}", quote_query(title)));
        }
        if let Some(folder) = &filter.folder_id {
            query.push_str(&format!(" and {} in parents", quote_query(folder)));
        }

        let url = self.drive_url(&["files"])?;
        let page_size = page_size.to_string();
        let mut params = vec![
            ("q", query.as_str()),
            ("pageSize", page_size.as_str()),
            ("orderBy", "modifiedTime desc"),
            (
                "fields",
                "nextPageToken,files(id,name,webViewLink,modifiedTime)",
            ),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let list: FileList = self.send_as(self.client.get(url).query(&params))?;
        Ok(SheetPage {
            entries: list
                .files
                .into_iter()
                .map(|f| SheetEntry {
                    url: f.web_view_link.unwrap_or_else(|| spreadsheet_url(&f.id)),
                    id: f.id,
                    title: f.name,
                    modified_at: f.modified_time,
                })
                .collect(),
            next_page_token: list.next_page_token,
        })
    }
}
