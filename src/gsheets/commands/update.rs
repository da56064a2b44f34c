use crate::backend::{SheetsBackend, ShareRole};
use crate::commands::{execute, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::UpdateRequest;
use crate::plan::MutationPlan;
use crate::retry::{Backoff, Clock};

pub fn run<B: SheetsBackend, C: Clock>(
    backend: &mut B,
    caller: &mut Backoff<C>,
    request: &UpdateRequest,
) -> Result<CmdResult> {
    let plan = MutationPlan::for_update(request);
    let mut result = CmdResult::default();
    if plan.len() == 1 {
        result.add_message(CmdMessage::warning(
            "Nothing to update: no data, formulas or formatting given",
        ));
    }

    // Update plans never share, so the role is irrelevant here
    let handle = execute::run_plan(backend, caller, &plan, ShareRole::Writer, &mut result)?;

    result.add_message(CmdMessage::success(format!(
        "Spreadsheet updated ({} of {} operations): {}",
        result.applied,
        plan.len(),
        handle.url
    )));
    Ok(result
        .with_summary("Spreadsheet updated successfully")
        .with_spreadsheet(handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::fixtures::{row, BackendFixture};
    use crate::error::{FailureKind, SheetsError};
    use crate::model::CellValue;
    use crate::retry::{ManualClock, RetryPolicy};
    use crate::validate::validate_update;
    use serde_json::json;

    #[test]
    fn overwrites_cells_and_keeps_the_rest() {
        let mut fixture = BackendFixture::new().with_sheet(
            "Budget",
            vec![row(&["Month", "Income"]), row(&["Jan", "5000"]), row(&["Feb", "5200"])],
        );
        let id = fixture.ids[0].clone();
        let clock = ManualClock::new();
        let mut caller = Backoff::with_clock(RetryPolicy::default(), &clock);
        let request = validate_update(&json!({
            "spreadsheet_id": id,
            "data": [["Month", "Income", "Savings"]],
            "formulas": {"C2": "=B2*0.2"}
        }))
        .unwrap();

        let result = run(&mut fixture.backend, &mut caller, &request).unwrap();
        assert_eq!(result.applied, 3);

        let sheet = result.spreadsheet.unwrap();
        let grid = fixture.backend.read_values(&sheet).unwrap();
        assert_eq!(grid[0], row(&["Month", "Income", "Savings"]));
        assert_eq!(grid[1][2], CellValue::from("=B2*0.2"));
        assert_eq!(grid[2], row(&["Feb", "5200"]));
    }

    #[test]
    fn clear_existing_replaces_everything() {
        let mut fixture = BackendFixture::new().with_sheet(
            "Old",
            vec![row(&["a", "b", "c"]), row(&["d", "e", "f"])],
        );
        let id = fixture.ids[0].clone();
        let clock = ManualClock::new();
        let mut caller = Backoff::with_clock(RetryPolicy::default(), &clock);
        let request = validate_update(&json!({
            "spreadsheet_id": id,
            "data": [["x"]],
            "clear_existing": true
        }))
        .unwrap();

        let result = run(&mut fixture.backend, &mut caller, &request).unwrap();
        let grid = fixture
            .backend
            .read_values(result.spreadsheet.as_ref().unwrap())
            .unwrap();
        assert_eq!(grid, vec![row(&["x"])]);
    }

    #[test]
    fn unknown_spreadsheet_stops_before_any_write() {
        let mut fixture = BackendFixture::new();
        let clock = ManualClock::new();
        let mut caller = Backoff::with_clock(RetryPolicy::default(), &clock);
        let request = validate_update(&json!({
            "spreadsheet_id": "does-not-exist",
            "data": [["x"]],
            "formulas": {"A2": "=A1"}
        }))
        .unwrap();

        let err = run(&mut fixture.backend, &mut caller, &request).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert!(matches!(err, SheetsError::NotFound(_)));
        assert_eq!(fixture.backend.calls(), ["open_spreadsheet"]);
    }

    #[test]
    fn empty_update_warns() {
        let mut fixture = BackendFixture::new().with_spreadsheets(1);
        let id = fixture.ids[0].clone();
        let clock = ManualClock::new();
        let mut caller = Backoff::with_clock(RetryPolicy::default(), &clock);
        let request = validate_update(&json!({ "spreadsheet_id": id })).unwrap();

        let result = run(&mut fixture.backend, &mut caller, &request).unwrap();
        assert!(result
            .messages
            .iter()
            .any(|m| m.content.starts_with("Nothing to update")));
    }
}
