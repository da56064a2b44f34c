#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn gsheets_cmd(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gsheets").unwrap();
    cmd.env_remove("GOOGLE_ACCESS_TOKEN")
        .env_remove("GOOGLE_CREDS_FILE")
        .env_remove("GSHEETS_MAX_ATTEMPTS")
        .env_remove("GSHEETS_TIMEOUT_SECS")
        .arg("--config-dir")
        .arg(config_dir.path());
    cmd
}

#[test]
fn test_tools_lists_all_four() {
    let temp = TempDir::new().unwrap();
    gsheets_cmd(&temp)
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("create_google_sheet"))
        .stdout(predicate::str::contains("update_google_sheet"))
        .stdout(predicate::str::contains("get_google_sheet"))
        .stdout(predicate::str::contains("list_google_sheets"));
}

#[test]
fn test_create_without_title_fails_before_any_request() {
    let temp = TempDir::new().unwrap();
    gsheets_cmd(&temp)
        .args(["create", "--data", r#"[["a", 1]]"#])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""status": "error""#))
        .stdout(predicate::str::contains("MissingField"));
}

#[test]
fn test_bad_formula_reference_is_invalid_field() {
    let temp = TempDir::new().unwrap();
    gsheets_cmd(&temp)
        .args([
            "create",
            "--title",
            "Budget",
            "--data",
            "[]",
            "--formulas",
            r#"{"4B": "=SUM(B2:B3)"}"#,
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("InvalidField"));
}

#[test]
fn test_call_reads_arguments_from_stdin() {
    let temp = TempDir::new().unwrap();
    gsheets_cmd(&temp)
        .args(["call", "list_google_sheets"])
        .write_stdin(r#"{"page_size": 0}"#)
        .assert()
        .failure()
        .stdout(predicate::str::contains("InvalidField"))
        .stdout(predicate::str::contains("page_size"));
}

#[test]
fn test_call_unknown_tool() {
    let temp = TempDir::new().unwrap();
    gsheets_cmd(&temp)
        .args(["call", "delete_google_sheet", "{}"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Unknown tool"));
}

#[test]
fn test_invalid_config_is_reported() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("config.json"), r#"{"share_role": "owner"}"#).unwrap();
    gsheets_cmd(&temp)
        .args(["get", "--id", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
