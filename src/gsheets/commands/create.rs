use crate::backend::{SheetsBackend, ShareRole};
use crate::commands::{execute, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::SheetRequest;
use crate::plan::MutationPlan;
use crate::retry::{Backoff, Clock};

pub fn run<B: SheetsBackend, C: Clock>(
    backend: &mut B,
    caller: &mut Backoff<C>,
    request: &SheetRequest,
    share_role: ShareRole,
) -> Result<CmdResult> {
    let plan = MutationPlan::for_create(request);
    let mut result = CmdResult::default();
    let handle = execute::run_plan(backend, caller, &plan, share_role, &mut result)?;

    result.add_message(CmdMessage::success(format!(
        "Spreadsheet created: {}",
        handle.url
    )));
    Ok(result
        .with_summary("Spreadsheet created successfully")
        .with_spreadsheet(handle))
}
