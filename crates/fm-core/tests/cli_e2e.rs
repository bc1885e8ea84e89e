//! CLI E2E tests for fm-core.
//!
//! Validates:
//! - `shifts` and `utility` write their default files in the working dir
//! - `--format json` prints a parseable run report
//! - Overrides (`--rows`, `--days`, `--seed`, `--out`, `--export-format`)
//! - `config show|validate|schema|presets`
//! - Exit codes for configuration, generation, and I/O failures

use std::fs;
use std::path::Path;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::{tempdir, TempDir};

// ============================================================================
// Helpers
// ============================================================================

/// fm-core isolated from the caller's environment and config dir.
fn fm_core(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("fm-core");
    cmd.timeout(Duration::from_secs(60))
        .current_dir(dir.path())
        .env("FM_CONFIG", "")
        .env_remove("FM_OUTPUT_FORMAT")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"));
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("parse JSON")
}

fn write_config(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

// ============================================================================
// Dataset commands
// ============================================================================

#[test]
fn shifts_writes_default_csv() {
    let dir = tempdir().unwrap();
    fm_core(&dir)
        .args(["shifts", "--no-render"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote 200 rows"))
        .stdout(predicate::str::contains("seed:   34"));

    let text = fs::read_to_string(dir.path().join("manufacturing_data.csv")).unwrap();
    assert!(text.starts_with("Machine Location,Shift,Cookies Produced"));
    assert_eq!(text.lines().count(), 201);
}

#[test]
fn shifts_renders_charts_in_text_mode() {
    let dir = tempdir().unwrap();
    fm_core(&dir)
        .args(["shifts", "--rows", "40", "--preview", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("== Shift production: first 5 rows =="))
        .stdout(predicate::str::contains("Average Defect Rate per Location"))
        .stdout(predicate::str::contains("Downtime Rate by Machine and Shift (heatmap)"));
}

#[test]
fn utility_json_report() {
    let dir = tempdir().unwrap();
    let json = json_stdout(fm_core(&dir).args(["--format", "json", "utility", "--days", "3"]));
    assert_eq!(json["pipeline"], "utility");
    assert_eq!(json["rows"], 72);
    assert_eq!(json["daily_summary"].as_array().unwrap().len(), 3);
    assert_eq!(json["config"]["source"], "defaults");
    assert!(dir.path().join("test.csv").exists());
}

#[test]
fn same_seed_same_bytes_via_cli() {
    let dir = tempdir().unwrap();
    for name in ["a.csv", "b.csv"] {
        fm_core(&dir)
            .args(["utility", "--days", "2", "--seed", "7", "--no-render", "--out", name])
            .assert()
            .success();
    }
    assert_eq!(
        fs::read(dir.path().join("a.csv")).unwrap(),
        fs::read(dir.path().join("b.csv")).unwrap()
    );
}

#[test]
fn random_seed_is_reported() {
    let dir = tempdir().unwrap();
    let json = json_stdout(fm_core(&dir).args([
        "--format",
        "json",
        "shifts",
        "--rows",
        "5",
        "--random-seed",
    ]));
    assert_eq!(json["seed"]["generated"], true);
    assert!(json["seed"]["value"].is_u64());
}

#[test]
fn parquet_export_format() {
    let dir = tempdir().unwrap();
    let json = json_stdout(fm_core(&dir).args([
        "--format",
        "json",
        "utility",
        "--days",
        "1",
        "--no-anomalies",
        "--export-format",
        "parquet",
    ]));
    assert_eq!(json["export"]["format"], "parquet");
    assert!(dir.path().join("test.parquet").exists());
    assert!(!dir.path().join("test.csv").exists());
}

#[test]
fn preset_quick_applies() {
    let dir = tempdir().unwrap();
    let json =
        json_stdout(fm_core(&dir).args(["--preset", "quick", "--format", "json", "utility"]));
    assert_eq!(json["rows"], 48);
    assert_eq!(json["config"]["source"], "preset:quick");
}

// ============================================================================
// Failure exit codes
// ============================================================================

#[test]
fn too_many_anomalies_is_a_config_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        dir.path(),
        "many.json",
        r#"{"schema_version":"1.0.0","utility":{"days":1,"anomalies":{"boiler_waste":{"count":30}}}}"#,
    );
    fm_core(&dir)
        .args(["utility", "--no-render", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("anomalies"));
    assert!(!dir.path().join("test.csv").exists());
}

#[test]
fn invalid_range_in_config_file_exits_10() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        dir.path(),
        "bad.json",
        r#"{"schema_version":"1.0.0","shifts":{"produced":{"min":700,"max":200}}}"#,
    );
    fm_core(&dir)
        .args(["shifts", "--no-render", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .code(10);
    assert!(!dir.path().join("manufacturing_data.csv").exists());
}

#[test]
fn unwritable_output_exits_13() {
    let dir = tempdir().unwrap();
    fm_core(&dir)
        .args(["shifts", "--no-render", "--out", "missing/dir/out.csv"])
        .assert()
        .failure()
        .code(13);
}

#[test]
fn json_errors_carry_codes() {
    let dir = tempdir().unwrap();
    let output = fm_core(&dir)
        .args(["--format", "json", "shifts", "--rows", "0"])
        .assert()
        .failure()
        .code(10)
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("parse JSON");
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], 10);
}

#[test]
fn unknown_preset_is_rejected_by_parser() {
    let dir = tempdir().unwrap();
    fm_core(&dir)
        .args(["--preset", "turbo", "shifts"])
        .assert()
        .failure()
        .code(2);
}

// ============================================================================
// Config commands
// ============================================================================

#[test]
fn config_show_defaults() {
    let dir = tempdir().unwrap();
    let json = json_stdout(fm_core(&dir).args(["--format", "json", "config", "show"]));
    assert_eq!(json["source"]["kind"], "defaults");
    assert_eq!(json["config"]["shifts"]["rows"], 200);
    assert_eq!(json["config"]["utility"]["days"], 30);
    assert_eq!(json["sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn config_validate_reports_all_errors() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        dir.path(),
        "bad.toml",
        "schema_version = \"1.0.0\"\n[shifts]\nrows = 0\nlocations = []\n",
    );
    let output = fm_core(&dir)
        .args(["--format", "json", "config", "validate"])
        .arg(&cfg)
        .assert()
        .code(10)
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["valid"], false);
    assert!(json["errors"].as_array().unwrap().len() >= 2);
}

#[test]
fn config_validate_default_is_valid() {
    let dir = tempdir().unwrap();
    fm_core(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("defaults: valid"));
}

#[test]
fn config_schema_is_json_schema() {
    let dir = tempdir().unwrap();
    let json = json_stdout(fm_core(&dir).args(["config", "schema"]));
    assert!(json["properties"]["shifts"].is_object());
    assert!(json["properties"]["utility"].is_object());
}

#[test]
fn config_presets_lists_all() {
    let dir = tempdir().unwrap();
    fm_core(&dir)
        .args(["config", "presets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default"))
        .stdout(predicate::str::contains("quick"))
        .stdout(predicate::str::contains("fault-heavy"));
}

#[test]
fn completions_for_bash() {
    let dir = tempdir().unwrap();
    fm_core(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fm-core"));
}
