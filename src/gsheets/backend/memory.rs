use super::{SheetsBackend, ShareRole};
use crate::a1::CellCoordinate;
use crate::error::{Result, SheetsError};
use crate::model::{
    spreadsheet_url, CellValue, FormatOptions, Grid, ListFilter, SheetEntry, SheetPage,
    SpreadsheetHandle,
};
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::BTreeMap;
use uuid::Uuid;

const DEFAULT_WORKSHEET: &str = "Sheet1";

#[derive(Debug, Clone)]
pub struct MemWorksheet {
    pub sheet_id: i64,
    pub title: String,
    pub cells: BTreeMap<CellCoordinate, CellValue>,
    pub format: FormatOptions,
}

impl MemWorksheet {
    fn new(sheet_id: i64, title: &str) -> Self {
        Self {
            sheet_id,
            title: title.to_string(),
            cells: BTreeMap::new(),
            format: FormatOptions::default(),
        }
    }

    fn set(&mut self, cell: CellCoordinate, value: CellValue) {
        if matches!(&value, CellValue::Text(s) if s.is_empty()) {
            self.cells.remove(&cell);
        } else {
            self.cells.insert(cell, value);
        }
    }

    /// Rows up to the last populated one; each row up to its last populated cell.
    fn to_grid(&self) -> Grid {
        let last_row = self.cells.keys().map(|c| c.row).max().unwrap_or(0);
        (1..=last_row)
            .map(|row| {
                let last_col = self
                    .cells
                    .keys()
                    .filter(|c| c.row == row)
                    .map(|c| c.column)
                    .max()
                    .unwrap_or(0);
                (1..=last_col)
                    .map(|column| {
                        self.cells
                            .get(&CellCoordinate { row, column })
                            .cloned()
                            .unwrap_or_else(|| CellValue::Text(String::new()))
                    })
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct MemSpreadsheet {
    pub id: String,
    pub title: String,
    pub folder_id: Option<String>,
    pub worksheets: Vec<MemWorksheet>,
    pub permissions: Vec<(String, ShareRole)>,
    pub modified_at: DateTime<Utc>,
}

struct ScriptedFailure {
    call: String,
    remaining: u32,
    make: Box<dyn Fn() -> SheetsError>,
}

/// In-memory spreadsheet service for tests.
///
/// Spreadsheets are kept in creation order. Every backend call is recorded by
/// name (`"create_spreadsheet"`, `"write_cell"`, ...) before it is served.
#[derive(Default)]
pub struct InMemoryBackend {
    spreadsheets: Vec<MemSpreadsheet>,
    calls: RefCell<Vec<String>>,
    failures: RefCell<Vec<ScriptedFailure>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` calls named `call` fail with the error built by `make`.
    pub fn fail_times(
        &mut self,
        call: &str,
        times: u32,
        make: impl Fn() -> SheetsError + 'static,
    ) -> &mut Self {
        self.failures.get_mut().push(ScriptedFailure {
            call: call.to_string(),
            remaining: times,
            make: Box::new(make),
        });
        self
    }

    /// Add a spreadsheet holding `rows` on its first worksheet; returns its id.
    pub fn seed(&mut self, title: &str, rows: &Grid, folder_id: Option<&str>) -> String {
        let id = new_id();
        let mut worksheet = MemWorksheet::new(0, DEFAULT_WORKSHEET);
        write_rows(&mut worksheet, CellCoordinate::ORIGIN, rows);
        self.spreadsheets.push(MemSpreadsheet {
            id: id.clone(),
            title: title.to_string(),
            folder_id: folder_id.map(str::to_string),
            worksheets: vec![worksheet],
            permissions: Vec::new(),
            modified_at: Utc::now(),
        });
        id
    }

    /// Add another worksheet to an existing spreadsheet.
    pub fn add_worksheet(&mut self, id: &str, title: &str) -> Result<()> {
        let spreadsheet = self.find_mut(id)?;
        let next_id = spreadsheet.worksheets.len() as i64;
        spreadsheet.worksheets.push(MemWorksheet::new(next_id, title));
        Ok(())
    }

    pub fn spreadsheet(&self, id: &str) -> Option<&MemSpreadsheet> {
        self.spreadsheets.iter().find(|s| s.id == id)
    }

    pub fn spreadsheets(&self) -> &[MemSpreadsheet] {
        &self.spreadsheets
    }

    /// Names of all calls served or refused so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn record(&self, call: &str) -> Result<()> {
        self.calls.borrow_mut().push(call.to_string());
        let mut failures = self.failures.borrow_mut();
        if let Some(failure) = failures
            .iter_mut()
            .find(|f| f.call == call && f.remaining > 0)
        {
            failure.remaining -= 1;
            return Err((failure.make)());
        }
        Ok(())
    }

    fn find(&self, id: &str) -> Result<&MemSpreadsheet> {
        self.spreadsheet(id)
            .ok_or_else(|| SheetsError::NotFound(format!("spreadsheet {}", id)))
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut MemSpreadsheet> {
        self.spreadsheets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SheetsError::NotFound(format!("spreadsheet {}", id)))
    }

    fn worksheet_mut(&mut self, sheet: &SpreadsheetHandle) -> Result<&mut MemWorksheet> {
        let spreadsheet = self.find_mut(&sheet.id)?;
        spreadsheet.modified_at = Utc::now();
        spreadsheet
            .worksheets
            .iter_mut()
            .find(|w| w.sheet_id == sheet.sheet_id)
            .ok_or_else(|| SheetsError::NotFound(format!("worksheet {}", sheet.sheet_title)))
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn handle(spreadsheet: &MemSpreadsheet, worksheet: &MemWorksheet) -> SpreadsheetHandle {
    SpreadsheetHandle {
        id: spreadsheet.id.clone(),
        url: spreadsheet_url(&spreadsheet.id),
        sheet_id: worksheet.sheet_id,
        sheet_title: worksheet.title.clone(),
    }
}

fn write_rows(worksheet: &mut MemWorksheet, origin: CellCoordinate, rows: &Grid) {
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            worksheet.set(origin.offset(r as u32, c as u32), value.clone());
        }
    }
}

impl SheetsBackend for InMemoryBackend {
    fn create_spreadsheet(&mut self, title: &str) -> Result<SpreadsheetHandle> {
        self.record("create_spreadsheet")?;
        let id = self.seed(title, &Vec::new(), None);
        let spreadsheet = self.find(&id)?;
        Ok(handle(spreadsheet, &spreadsheet.worksheets[0]))
    }

    fn open_spreadsheet(&self, id: &str, worksheet: Option<&str>) -> Result<SpreadsheetHandle> {
        self.record("open_spreadsheet")?;
        let spreadsheet = self.find(id)?;
        let target = match worksheet {
            Some(name) => spreadsheet.worksheets.iter().find(|w| w.title == name),
            None => spreadsheet.worksheets.first(),
        }
        .ok_or_else(|| {
            SheetsError::NotFound(format!(
                "worksheet {} in spreadsheet {}",
                worksheet.unwrap_or(DEFAULT_WORKSHEET),
                id
            ))
        })?;
        Ok(handle(spreadsheet, target))
    }

    fn clear_values(&mut self, sheet: &SpreadsheetHandle) -> Result<()> {
        self.record("clear_values")?;
        self.worksheet_mut(sheet)?.cells.clear();
        Ok(())
    }

    fn write_range(
        &mut self,
        sheet: &SpreadsheetHandle,
        origin: CellCoordinate,
        rows: &Grid,
    ) -> Result<()> {
        self.record("write_range")?;
        write_rows(self.worksheet_mut(sheet)?, origin, rows);
        Ok(())
    }

    fn write_cell(
        &mut self,
        sheet: &SpreadsheetHandle,
        cell: CellCoordinate,
        text: &str,
    ) -> Result<()> {
        self.record("write_cell")?;
        self.worksheet_mut(sheet)?
            .set(cell, CellValue::Text(text.to_string()));
        Ok(())
    }

    fn apply_formatting(
        &mut self,
        sheet: &SpreadsheetHandle,
        options: FormatOptions,
        _extent: Option<(u32, u32)>,
    ) -> Result<()> {
        self.record("apply_formatting")?;
        let worksheet = self.worksheet_mut(sheet)?;
        worksheet.format.bold_header |= options.bold_header;
        worksheet.format.freeze_header_row |= options.freeze_header_row;
        worksheet.format.basic_filter |= options.basic_filter;
        Ok(())
    }

    fn share(&mut self, sheet: &SpreadsheetHandle, email: &str, role: ShareRole) -> Result<()> {
        self.record("share")?;
        self.find_mut(&sheet.id)?
            .permissions
            .push((email.to_string(), role));
        Ok(())
    }

    fn read_values(&self, sheet: &SpreadsheetHandle) -> Result<Grid> {
        self.record("read_values")?;
        let spreadsheet = self.find(&sheet.id)?;
        spreadsheet
            .worksheets
            .iter()
            .find(|w| w.sheet_id == sheet.sheet_id)
            .map(MemWorksheet::to_grid)
            .ok_or_else(|| SheetsError::NotFound(format!("worksheet {}", sheet.sheet_title)))
    }

    fn list_spreadsheets(
        &self,
        filter: &ListFilter,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<SheetPage> {
        self.record("list_spreadsheets")?;
        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| SheetsError::remote(Some(400), format!("bad page token '{}'", token)))?,
            None => 0,
        };

        let needle = filter.title_contains.as_deref().map(str::to_lowercase);
        let matching: Vec<&MemSpreadsheet> = self
            .spreadsheets
            .iter()
            .filter(|s| match &needle {
                Some(n) => s.title.to_lowercase().contains(n),
                None => true,
            })
            .filter(|s| match &filter.folder_id {
                Some(folder) => s.folder_id.as_deref() == Some(folder.as_str()),
                None => true,
            })
            .collect();

        let end = offset.saturating_add(page_size as usize).min(matching.len());
        let entries = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|s| SheetEntry {
                id: s.id.clone(),
                title: s.title.clone(),
                url: spreadsheet_url(&s.id),
                modified_at: Some(s.modified_at),
            })
            .collect();

        Ok(SheetPage {
            entries,
            next_page_token: (end < matching.len()).then(|| end.to_string()),
        })
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;

    pub fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    pub struct BackendFixture {
        pub backend: InMemoryBackend,
        pub ids: Vec<String>,
    }

    impl Default for BackendFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl BackendFixture {
        pub fn new() -> Self {
            Self {
                backend: InMemoryBackend::new(),
                ids: Vec::new(),
            }
        }

        pub fn with_spreadsheets(mut self, count: usize) -> Self {
            for i in 0..count {
                let title = format!("Report {}", i + 1);
                let id = self
                    .backend
                    .seed(&title, &vec![row(&["Quarter", "Total"])], None);
                self.ids.push(id);
            }
            self
        }

        pub fn with_sheet(mut self, title: &str, rows: Grid) -> Self {
            let id = self.backend.seed(title, &rows, None);
            self.ids.push(id);
            self
        }

        pub fn with_sheet_in_folder(mut self, title: &str, folder_id: &str) -> Self {
            let id = self.backend.seed(title, &Vec::new(), Some(folder_id));
            self.ids.push(id);
            self
        }
    }
}
