//! End-to-end checks against the built binary.
//!
//! Only read-only surfaces are exercised here; the install path touches
//! package managers and system services and is covered by the unit tests
//! around its decision logic instead.
use std::process::Command;
use tempfile::TempDir;

fn stackup() -> Command {
    Command::new(env!("CARGO_BIN_EXE_stackup"))
}

#[test]
fn help_lists_the_workflow_commands() {
    let output = stackup().arg("--help").output().expect("run stackup --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("install"));
    assert!(stdout.contains("status"));
}

#[test]
fn status_json_reports_unset_policy_in_an_empty_directory() {
    let dir = TempDir::new().unwrap();
    let output = stackup()
        .args(["status", "--json"])
        .current_dir(dir.path())
        .output()
        .expect("run stackup status");
    assert!(output.status.success(), "status must not fail on a bare host");

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("status --json emits valid JSON");
    assert_eq!(report["database_policy"], "unset");
    assert!(report["compose_file"].is_null());
}

#[test]
fn status_reads_the_policy_flag_from_the_env_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".env"), "USE_DB=\"true\"\r\n").unwrap();
    let output = stackup()
        .args(["status", "--json"])
        .current_dir(dir.path())
        .output()
        .expect("run stackup status");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["database_policy"], "enabled");
}

#[test]
fn unknown_subcommand_is_rejected() {
    let output = stackup().arg("teardown").output().expect("run stackup");
    assert!(!output.status.success());
}
