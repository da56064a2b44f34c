//! # Mutation Plans
//!
//! A create or update request is turned into a [`MutationPlan`] before any remote
//! call is made. The plan fixes the order of operations:
//!
//! 1. `CreateSpreadsheet` (create) or `OpenSpreadsheet` (update)
//! 2. `ClearValues`, when an update asks to replace existing values
//! 3. `WriteRange` for the bounding box of `data`, anchored at A1
//! 4. `WriteFormula` per formula, by ascending row then column
//! 5. `ApplyFormatting`, when any flag is set
//! 6. `ShareWith`, when an email is given
//!
//! Formulas are always written after the data they may reference.

use crate::a1::{self, CellCoordinate};
use crate::model::{bounding_box, FormatOptions, FormulaCell, Grid, SheetRequest, UpdateRequest};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    CreateSpreadsheet {
        title: String,
    },
    OpenSpreadsheet {
        id: String,
        worksheet: Option<String>,
    },
    ClearValues,
    WriteRange {
        origin: CellCoordinate,
        grid: Grid,
    },
    WriteFormula {
        coordinate: CellCoordinate,
        text: String,
    },
    ApplyFormatting {
        options: FormatOptions,
        extent: Option<(u32, u32)>,
    },
    ShareWith {
        email: String,
    },
}

impl Operation {
    /// Short name used in logs and progress messages.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateSpreadsheet { .. } => "create_spreadsheet",
            Operation::OpenSpreadsheet { .. } => "open_spreadsheet",
            Operation::ClearValues => "clear_values",
            Operation::WriteRange { .. } => "write_range",
            Operation::WriteFormula { .. } => "write_formula",
            Operation::ApplyFormatting { .. } => "apply_formatting",
            Operation::ShareWith { .. } => "share",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateSpreadsheet { title } => write!(f, "create spreadsheet '{}'", title),
            Operation::OpenSpreadsheet { id, .. } => write!(f, "open spreadsheet {}", id),
            Operation::ClearValues => write!(f, "clear existing values"),
            Operation::WriteRange { origin, grid } => {
                let (rows, columns) = bounding_box(grid);
                write!(f, "write {}", a1::range_a1(*origin, rows, columns))
            }
            Operation::WriteFormula { coordinate, .. } => write!(f, "write formula at {}", coordinate),
            Operation::ApplyFormatting { .. } => write!(f, "apply formatting"),
            Operation::ShareWith { email } => write!(f, "share with {}", email),
        }
    }
}

/// The ordered operations for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPlan {
    operations: Vec<Operation>,
}

impl MutationPlan {
    pub fn for_create(request: &SheetRequest) -> Self {
        let mut operations = vec![Operation::CreateSpreadsheet {
            title: request.title.clone(),
        }];
        push_writes(
            &mut operations,
            &request.data,
            &request.formulas,
            request.format_options,
        );
        if let Some(email) = &request.share_with {
            operations.push(Operation::ShareWith {
                email: email.clone(),
            });
        }
        Self { operations }
    }

    pub fn for_update(request: &UpdateRequest) -> Self {
        let mut operations = vec![Operation::OpenSpreadsheet {
            id: request.spreadsheet_id.clone(),
            worksheet: request.worksheet_name.clone(),
        }];
        if request.clear_existing {
            operations.push(Operation::ClearValues);
        }
        push_writes(
            &mut operations,
            &request.data,
            &request.formulas,
            request.format_options,
        );
        Self { operations }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

fn push_writes(
    operations: &mut Vec<Operation>,
    data: &Grid,
    formulas: &[FormulaCell],
    format_options: FormatOptions,
) {
    let (rows, columns) = bounding_box(data);
    if rows > 0 {
        operations.push(Operation::WriteRange {
            origin: CellCoordinate::ORIGIN,
            grid: data.clone(),
        });
    }

    let mut ordered: Vec<&FormulaCell> = formulas.iter().collect();
    ordered.sort_by_key(|f| (f.coordinate.row, f.coordinate.column));
    operations.extend(ordered.into_iter().map(|f| Operation::WriteFormula {
        coordinate: f.coordinate,
        text: f.formula.clone(),
    }));

    if format_options.any() {
        operations.push(Operation::ApplyFormatting {
            options: format_options,
            extent: (rows > 0).then_some((rows, columns)),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validate_create, validate_update};
    use serde_json::json;

    fn names(plan: &MutationPlan) -> Vec<&'static str> {
        plan.operations().iter().map(Operation::name).collect()
    }

    #[test]
    fn formulas_follow_data_in_row_then_column_order() {
        let request = validate_create(&json!({
            "title": "People",
            "data": [["Name", "Age"], ["Alice", 30], ["Bob", 25]],
            "formulas": {"C4": "=AVERAGE(B2:B3)", "B4": "=SUM(B2:B3)"}
        }))
        .unwrap();
        let plan = MutationPlan::for_create(&request);

        assert_eq!(
            names(&plan),
            ["create_spreadsheet", "write_range", "write_formula", "write_formula"]
        );
        let formula_cells: Vec<String> = plan
            .operations()
            .iter()
            .filter_map(|op| match op {
                Operation::WriteFormula { coordinate, .. } => Some(a1::encode(*coordinate)),
                _ => None,
            })
            .collect();
        assert_eq!(formula_cells, ["B4", "C4"]);
    }

    #[test]
    fn lower_rows_come_first_regardless_of_column() {
        let request = validate_create(&json!({
            "title": "T",
            "data": [],
            "formulas": {"A3": "=1", "Z1": "=2", "B2": "=3", "A2": "=4"}
        }))
        .unwrap();
        let plan = MutationPlan::for_create(&request);
        let cells: Vec<String> = plan
            .operations()
            .iter()
            .filter_map(|op| match op {
                Operation::WriteFormula { coordinate, .. } => Some(coordinate.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(cells, ["Z1", "A2", "B2", "A3"]);
    }

    #[test]
    fn full_create_plan_order() {
        let request = validate_create(&json!({
            "title": "Tracker",
            "data": [["Task", "Owner"], ["Design", "Bob", "late"]],
            "formulas": {"D1": "=COUNTA(A:A)"},
            "share_with": "lead@example.com",
            "format_options": ["bold_header", "freeze_header_row"]
        }))
        .unwrap();
        let plan = MutationPlan::for_create(&request);

        assert_eq!(
            names(&plan),
            [
                "create_spreadsheet",
                "write_range",
                "write_formula",
                "apply_formatting",
                "share"
            ]
        );
        match &plan.operations()[3] {
            Operation::ApplyFormatting { extent, .. } => assert_eq!(*extent, Some((2, 3))),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(plan.operations()[1].to_string(), "write A1:C2");
    }

    #[test]
    fn empty_data_skips_range_write() {
        let request = validate_create(&json!({"title": "Empty", "data": []})).unwrap();
        let plan = MutationPlan::for_create(&request);
        assert_eq!(names(&plan), ["create_spreadsheet"]);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn update_plan_opens_then_clears() {
        let request = validate_update(&json!({
            "spreadsheet_id": "abc",
            "data": [["x"]],
            "clear_existing": true,
            "format_options": ["basic_filter"]
        }))
        .unwrap();
        let plan = MutationPlan::for_update(&request);
        assert_eq!(
            names(&plan),
            ["open_spreadsheet", "clear_values", "write_range", "apply_formatting"]
        );
    }
}
