use crate::backend::SheetsBackend;
use crate::commands::CmdResult;
use crate::error::Result;
use crate::model::GetRequest;
use crate::retry::{Backoff, Clock};

/// Fetch every populated row of the target worksheet.
pub fn run<B: SheetsBackend, C: Clock>(
    backend: &B,
    caller: &mut Backoff<C>,
    request: &GetRequest,
) -> Result<CmdResult> {
    let sheet = caller.call("open_spreadsheet", || {
        backend.open_spreadsheet(&request.spreadsheet_id, request.worksheet_name.as_deref())
    })?;
    let grid = caller.call("read_values", || backend.read_values(&sheet))?;

    let summary = format!(
        "Retrieved {} row{} from '{}'",
        grid.len(),
        if grid.len() == 1 { "" } else { "s" },
        sheet.sheet_title
    );
    Ok(CmdResult::default()
        .with_summary(summary)
        .with_data(grid)
        .with_spreadsheet(sheet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::fixtures::{row, BackendFixture};
    use crate::error::FailureKind;
    use crate::retry::{ManualClock, RetryPolicy};

    fn request(id: &str) -> GetRequest {
        GetRequest {
            spreadsheet_id: id.to_string(),
            worksheet_name: None,
        }
    }

    #[test]
    fn returns_all_rows() {
        let fixture = BackendFixture::new()
            .with_sheet("Team", vec![row(&["Task", "Owner"]), row(&["Design", "Bob"])]);
        let clock = ManualClock::new();
        let mut caller = Backoff::with_clock(RetryPolicy::default(), &clock);

        let result = run(&fixture.backend, &mut caller, &request(&fixture.ids[0])).unwrap();
        assert_eq!(result.data.unwrap().len(), 2);
        assert_eq!(result.summary, "Retrieved 2 rows from 'Sheet1'");
    }

    #[test]
    fn empty_sheet_is_an_empty_grid_not_an_error() {
        let fixture = BackendFixture::new().with_sheet("Blank", Vec::new());
        let clock = ManualClock::new();
        let mut caller = Backoff::with_clock(RetryPolicy::default(), &clock);

        let result = run(&fixture.backend, &mut caller, &request(&fixture.ids[0])).unwrap();
        assert_eq!(result.data, Some(Vec::new()));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let fixture = BackendFixture::new();
        let clock = ManualClock::new();
        let mut caller = Backoff::with_clock(RetryPolicy::default(), &clock);

        let err = run(&fixture.backend, &mut caller, &request("nope")).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert_eq!(fixture.backend.call_count(), 1);
    }
}
