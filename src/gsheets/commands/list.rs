use crate::backend::SheetsBackend;
use crate::commands::CmdResult;
use crate::error::{Result, SheetsError};
use crate::model::ListRequest;
use crate::retry::{Backoff, Clock};

/// One page of accessible spreadsheets matching the filter.
pub fn run<B: SheetsBackend, C: Clock>(
    backend: &B,
    caller: &mut Backoff<C>,
    request: &ListRequest,
) -> Result<CmdResult> {
    if request.page_size == 0 {
        return Err(SheetsError::invalid("page_size", "must be positive"));
    }

    let page = caller.call("list_spreadsheets", || {
        backend.list_spreadsheets(
            &request.filter,
            request.page_token.as_deref(),
            request.page_size,
        )
    })?;

    let summary = match (page.entries.len(), &page.next_page_token) {
        (0, _) => "No spreadsheets found".to_string(),
        (n, Some(_)) => format!("Found {} spreadsheets (more available)", n),
        (1, None) => "Found 1 spreadsheet".to_string(),
        (n, None) => format!("Found {} spreadsheets", n),
    };
    Ok(CmdResult::default()
        .with_summary(summary)
        .with_sheets(page.entries, page.next_page_token))
}
