//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against an isolated data
//! directory and verify outputs.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run the CLI with an isolated data directory and return output.
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "-p", "codebreak-cli", "--"])
        .args(args)
        .env("CODEBREAK_DATA_DIR", data_dir)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_cli_success(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\nstderr: {stderr}");
    stdout
}

#[test]
fn help_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("productivity timer"));
}

#[test]
fn profile_list_seeds_builtin_presets() {
    let dir = TempDir::new().unwrap();
    let stdout = run_cli_success(dir.path(), &["profile", "list"]);
    assert!(stdout.contains("Pomodoro"));
    assert!(stdout.contains("Long Work"));
    assert!(stdout.contains("Short Focus"));
}

#[test]
fn profile_add_persists_across_invocations() {
    let dir = TempDir::new().unwrap();
    run_cli_success(dir.path(), &["profile", "add", "Mine"]);
    let stdout = run_cli_success(dir.path(), &["profile", "list"]);
    assert!(stdout.contains("Mine"));
}

#[test]
fn duplicate_profile_add_fails() {
    let dir = TempDir::new().unwrap();
    run_cli_success(dir.path(), &["profile", "add", "Mine"]);
    let (_, stderr, code) = run_cli(dir.path(), &["profile", "add", "Mine"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("already exists"));
}

#[test]
fn builtin_preset_needs_force_to_delete() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["profile", "delete", "Short Focus"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("cannot be deleted"));

    run_cli_success(dir.path(), &["profile", "delete", "Short Focus", "--force"]);
    let stdout = run_cli_success(dir.path(), &["profile", "list"]);
    assert!(!stdout.contains("Short Focus"));
}

#[test]
fn export_import_roundtrip_adds_renamed_copies() {
    let dir = TempDir::new().unwrap();
    let export = dir.path().join("export.json");
    let export_arg = export.to_str().unwrap();

    run_cli_success(dir.path(), &["profile", "export", export_arg]);
    let stdout = run_cli_success(dir.path(), &["profile", "import", export_arg]);
    assert!(stdout.contains("added: 3"));

    let listed = run_cli_success(dir.path(), &["profile", "list"]);
    assert!(listed.contains("Pomodoro (1)"));
}

#[test]
fn profile_use_switches_current() {
    let dir = TempDir::new().unwrap();
    run_cli_success(dir.path(), &["profile", "use", "Long Work"]);
    let stdout = run_cli_success(dir.path(), &["profile", "list"]);
    assert!(stdout.contains("* Long Work"));
}

#[test]
fn config_set_then_get() {
    let dir = TempDir::new().unwrap();
    run_cli_success(dir.path(), &["config", "set", "windowWidth", "800"]);
    let stdout = run_cli_success(dir.path(), &["config", "get", "windowWidth"]);
    assert_eq!(stdout.trim(), "800");
}

#[test]
fn timer_status_reports_current_profile() {
    let dir = TempDir::new().unwrap();
    let stdout = run_cli_success(dir.path(), &["timer", "status"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("status is JSON");
    assert_eq!(json["state"], "stopped");
    assert_eq!(json["remainingSeconds"], 25 * 60);
    assert_eq!(json["profile"], "Pomodoro");
}

#[test]
fn validate_reports_clean_store() {
    let dir = TempDir::new().unwrap();
    let stdout = run_cli_success(dir.path(), &["profile", "validate"]);
    assert!(stdout.contains("valid"));
}
