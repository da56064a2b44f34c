use crate::backend::{SheetsBackend, ShareRole};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{Result, SheetsError};
use crate::model::SpreadsheetHandle;
use crate::plan::{MutationPlan, Operation};
use crate::retry::{Backoff, Clock};

/// Run `plan` in order, each operation through `caller`.
///
/// The first operation must create or open the spreadsheet. A failure after that
/// stops the plan and is reported as [`SheetsError::Aborted`] with the number of
/// operations already applied; nothing is rolled back.
pub fn run_plan<B: SheetsBackend, C: Clock>(
    backend: &mut B,
    caller: &mut Backoff<C>,
    plan: &MutationPlan,
    share_role: ShareRole,
    result: &mut CmdResult,
) -> Result<SpreadsheetHandle> {
    let total = plan.len();
    let mut sheet: Option<SpreadsheetHandle> = None;
    let mut announced_formulas = false;

    for (index, operation) in plan.operations().iter().enumerate() {
        tracing::debug!(step = index + 1, total, operation = %operation, "executing");

        if matches!(operation, Operation::WriteFormula { .. }) {
            if !announced_formulas {
                result.add_message(CmdMessage::info("Applying formulas..."));
                announced_formulas = true;
            }
        } else if let Some(note) = progress_note(operation) {
            result.add_message(CmdMessage::info(note));
        }

        let outcome = apply(backend, caller, operation, sheet.as_ref(), share_role);
        match outcome {
            Ok(Some(handle)) => sheet = Some(handle),
            Ok(None) => {}
            Err(err) if index == 0 => {
                tracing::error!(operation = %operation, error = %err, "plan failed before any change");
                return Err(err);
            }
            Err(err) => {
                tracing::error!(
                    operation = %operation,
                    completed = index,
                    total,
                    error = %err,
                    "plan aborted; applied operations are not rolled back"
                );
                return Err(SheetsError::Aborted {
                    completed: index,
                    total,
                    url: sheet.map(|s| s.url),
                    source: Box::new(err),
                });
            }
        }
        result.applied = index + 1;
    }

    tracing::info!(operations = total, "plan complete");
    sheet.ok_or_else(|| SheetsError::invalid("plan", "no spreadsheet was created or opened"))
}

fn progress_note(operation: &Operation) -> Option<String> {
    match operation {
        Operation::CreateSpreadsheet { title } => {
            Some(format!("Creating spreadsheet '{}'...", title))
        }
        Operation::OpenSpreadsheet { id, .. } => Some(format!("Opening spreadsheet {}...", id)),
        Operation::ClearValues => Some("Clearing existing values...".to_string()),
        Operation::WriteRange { .. } => Some("Populating data...".to_string()),
        Operation::ApplyFormatting { .. } => Some("Applying formatting...".to_string()),
        Operation::ShareWith { email } => Some(format!("Sharing spreadsheet with {}...", email)),
        Operation::WriteFormula { .. } => None,
    }
}

/// Perform one operation. Returns the handle when the operation yields one.
fn apply<B: SheetsBackend, C: Clock>(
    backend: &mut B,
    caller: &mut Backoff<C>,
    operation: &Operation,
    sheet: Option<&SpreadsheetHandle>,
    share_role: ShareRole,
) -> Result<Option<SpreadsheetHandle>> {
    let label = operation.name();
    match operation {
        Operation::CreateSpreadsheet { title } => caller
            .call(label, || backend.create_spreadsheet(title))
            .map(Some),
        Operation::OpenSpreadsheet { id, worksheet } => caller
            .call(label, || backend.open_spreadsheet(id, worksheet.as_deref()))
            .map(Some),
        _ => {
            let sheet = sheet.ok_or_else(|| {
                SheetsError::invalid("plan", format!("cannot {} before opening a spreadsheet", operation))
            })?;
            match operation {
                Operation::ClearValues => caller.call(label, || backend.clear_values(sheet)),
                Operation::WriteRange { origin, grid } => {
                    caller.call(label, || backend.write_range(sheet, *origin, grid))
                }
                Operation::WriteFormula { coordinate, text } => {
                    caller.call(label, || backend.write_cell(sheet, *coordinate, text))
                }
                Operation::ApplyFormatting { options, extent } => {
                    caller.call(label, || backend.apply_formatting(sheet, *options, *extent))
                }
                Operation::ShareWith { email } => {
                    caller.call(label, || backend.share(sheet, email, share_role))
                }
                Operation::CreateSpreadsheet { .. } | Operation::OpenSpreadsheet { .. } => Ok(()),
            }?;
            Ok(None)
        }
    }
}
