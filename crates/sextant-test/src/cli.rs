//! CLI regression tests for the `sextant` binary.
//!
//! These tests invoke the binary as a subprocess to catch regressions in flag
//! names, exit codes, and output formats.
//!
//! Run with: `cargo test -p sextant-test`
//! Requires the `sextant` binary to be built first (`cargo build -p sextant`).

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns an assert_cmd Command wrapping the `sextant` binary.
fn sextant() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("sextant")
        .expect("sextant binary not found, run `cargo build -p sextant` first");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Absolute path to the shared test fixtures directory.
fn fixtures() -> PathBuf {
    // CARGO_MANIFEST_DIR = .../crates/sextant-test
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates/")
        .parent()
        .expect("workspace root")
        .join("tests/fixtures")
}

fn units(name: &str) -> PathBuf {
    fixtures().join("units").join(name)
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let s = String::from_utf8(output.stdout.clone()).expect("stdout should be valid UTF-8");
    serde_json::from_str(&s).expect("stdout should be valid JSON")
}

// ---------------------------------------------------------------------------
// sextant validate
// ---------------------------------------------------------------------------

#[test]
fn validate_clean_units_exits_zero() {
    sextant()
        .args(["validate", "--units"])
        .arg(units("sandbox.yaml"))
        .assert()
        .success()
        .stderr(contains("endpoint model is valid"))
        .stderr(contains("3 operation(s)"));
}

#[test]
fn validate_duplicate_route_exits_one() {
    sextant()
        .args(["validate", "--units"])
        .arg(units("duplicate-route.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E2101"))
        .stderr(contains("GetUserById"));
}

#[test]
fn validate_missing_route_exits_one_and_keeps_other_units() {
    sextant()
        .args(["validate", "--units"])
        .arg(units("missing-route.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E2020: operation 'Helper' has no route binding"))
        .stderr(contains("1 operation(s), 1 excluded"));
}

#[test]
fn validate_missing_file_exits_one() {
    sextant()
        .args(["validate", "--units", "this-file-does-not-exist.yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E2000"));
}

#[test]
fn validate_malformed_unit_file_exits_one() {
    sextant()
        .args(["validate", "--units"])
        .arg(units("malformed.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("invalid unit file"));
}

#[test]
fn validate_without_inputs_exits_two() {
    // At least one of --units / --source is required; clap exits with 2.
    sextant().args(["validate"]).assert().failure().code(2);
}

#[test]
fn validate_warnings_pass_unless_promoted() {
    sextant()
        .args(["validate", "--units"])
        .arg(units("warnings.yaml"))
        .assert()
        .success()
        .stderr(contains("with 1 warning(s)"))
        .stderr(contains("warning[E2105] GetDashboardSummary"));

    sextant()
        .args(["validate", "--warnings-as-errors", "--units"])
        .arg(units("warnings.yaml"))
        .assert()
        .failure()
        .code(1);
}

#[test]
fn validate_unauthorized_status_is_configurable() {
    sextant()
        .args(["validate", "--unauthorized-status", "200", "--units"])
        .arg(units("warnings.yaml"))
        .assert()
        .success()
        .stderr(contains("endpoint model is valid"))
        .stderr(contains("0 warning(s)"));
}

#[test]
fn validate_strict_rejects_unknown_annotations() {
    sextant()
        .args(["validate", "--units"])
        .arg(units("unknown-annotation.yaml"))
        .assert()
        .success();

    sextant()
        .args(["validate", "--strict", "--units"])
        .arg(units("unknown-annotation.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E2009"));
}

#[test]
fn validate_json_format_outputs_valid_json() {
    let output = sextant()
        .args(["validate", "--format", "json", "--units"])
        .arg(units("sandbox.yaml"))
        .assert()
        .success()
        .get_output()
        .clone();

    let v = stdout_json(&output);
    assert_eq!(v["valid"], true);
    assert_eq!(v["summary"]["units"], 3);
    assert_eq!(v["summary"]["operations"], 3);
    assert!(v["findings"].as_array().is_some_and(Vec::is_empty));
}

#[test]
fn validate_json_format_reports_errors_and_findings() {
    let output = sextant()
        .args(["validate", "--format", "json", "--units"])
        .arg(units("missing-route.yaml"))
        .arg(units("duplicate-route.yaml"))
        .assert()
        .failure()
        .code(1)
        .get_output()
        .clone();

    let v = stdout_json(&output);
    assert_eq!(v["valid"], false);
    assert_eq!(v["errors"][0]["code"], "E2020");
    assert_eq!(v["errors"][0]["unit"], "Helper");
    assert_eq!(v["findings"][0]["id"], "E2101");
    assert_eq!(v["findings"][0]["severity"], "error");
    assert_eq!(v["findings"][0]["origin"], "duplicate-route.yaml#2");
}

#[test]
fn validate_scans_source_tree_with_route_prefix() {
    sextant()
        .args(["validate", "--source"])
        .arg(fixtures().join("functions"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("error[E2102] DeleteAsync"))
        .stderr(contains("warning[E2103] DeleteAsync"))
        .stderr(contains("/api/v2/recall/sandbox/{moduleId}"))
        .stderr(contains("[Sandbox/SandboxTriggers.cs:"));
}

#[test]
fn validate_parallelism_does_not_change_output() {
    let run = |jobs: &str| {
        sextant()
            .args(["validate", "--format", "json", "--jobs", jobs, "--units"])
            .arg(units("sandbox.yaml"))
            .arg(units("duplicate-route.yaml"))
            .arg(units("warnings.yaml"))
            .assert()
            .failure()
            .get_output()
            .stdout
            .clone()
    };
    assert_eq!(run("1"), run("8"));
}

// ---------------------------------------------------------------------------
// sextant export
// ---------------------------------------------------------------------------

#[test]
fn export_writes_model_document() {
    let tmp = TempDir::new().expect("temp dir");
    let out = tmp.path().join("model.json");

    sextant()
        .args(["export", "--units"])
        .arg(units("sandbox.yaml"))
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(contains("exported 3 operation(s)"));

    let content = std::fs::read_to_string(&out).expect("export written");
    let v: serde_json::Value = serde_json::from_str(&content).expect("export is JSON");
    assert_eq!(v["format_version"], 1);
    assert!(v["fingerprint"].as_str().is_some_and(|f| f.starts_with("sha256:")));
    assert_eq!(v["model"]["operations"][0]["name"], "GetAsync");
    assert_eq!(v["model"]["operations"][0]["security"]["type"], "required");
    assert_eq!(v["model"]["operations"][1]["security"]["type"], "anonymous");
    assert_eq!(v["model"]["route_index"].as_array().map(Vec::len), Some(3));
}

#[test]
fn export_to_stdout_is_deterministic() {
    let run = || {
        sextant()
            .args(["export", "--compact", "--units"])
            .arg(units("sandbox.yaml"))
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    };
    let first = run();
    assert_eq!(first, run());
    assert_eq!(first.iter().filter(|b| **b == b'\n').count(), 1);
}

#[test]
fn export_includes_excluded_units_as_errors() {
    let output = sextant()
        .args(["export", "--units"])
        .arg(units("missing-route.yaml"))
        .assert()
        .success()
        .get_output()
        .clone();

    let v = stdout_json(&output);
    assert_eq!(v["model"]["operations"].as_array().map(Vec::len), Some(1));
    assert_eq!(v["errors"][0]["code"], "E2020");
}

// ---------------------------------------------------------------------------
// sextant lookup
// ---------------------------------------------------------------------------

#[test]
fn lookup_by_concrete_path() {
    sextant()
        .args(["lookup", "--units"])
        .arg(units("sandbox.yaml"))
        .args(["--route", "GET /sandbox/az-204"])
        .assert()
        .success()
        .stdout(contains("GetAsync GET sandbox/{moduleId}"))
        .stdout(contains("captured: moduleId = az-204"));
}

#[test]
fn lookup_prefers_literal_segments() {
    sextant()
        .args(["lookup", "--units"])
        .arg(units("sandbox.yaml"))
        .args(["--route", "get /Sandbox/Verify/"])
        .assert()
        .success()
        .stdout(contains("VerifyModules"));
}

#[test]
fn lookup_by_template_in_source_tree() {
    sextant()
        .args(["lookup", "--source"])
        .arg(fixtures().join("functions"))
        .args(["--route", "DELETE /api/v2/recall/sandbox/{id}"])
        .assert()
        .success()
        .stdout(contains("DeleteAsync"));
}

#[test]
fn lookup_wrong_verb_lists_allowed() {
    sextant()
        .args(["lookup", "--source"])
        .arg(fixtures().join("functions"))
        .args(["--route", "PUT /api/v2/recall/sandbox/az-204"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("allowed: DELETE, GET"));
}

#[test]
fn lookup_unknown_route_exits_one() {
    sextant()
        .args(["lookup", "--units"])
        .arg(units("sandbox.yaml"))
        .args(["--route", "GET /nowhere"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("no operation serves GET /nowhere"));
}

#[test]
fn lookup_by_name_as_json() {
    let output = sextant()
        .args(["lookup", "--format", "json", "--name", "PreprovisionSandboxAsync", "--units"])
        .arg(units("sandbox.yaml"))
        .assert()
        .success()
        .get_output()
        .clone();

    let v = stdout_json(&output);
    assert_eq!(v["operation"]["route"]["verb"], "POST");
    assert_eq!(
        v["operation"]["security"]["requirements"][0]["groups"],
        serde_json::json!(["admins", "writers"])
    );
    assert!(v.get("params").is_none());
}

#[test]
fn lookup_route_and_name_conflict() {
    sextant()
        .args(["lookup", "--route", "GET /a", "--name", "A", "--units"])
        .arg(units("sandbox.yaml"))
        .assert()
        .failure()
        .code(2);
}

// ---------------------------------------------------------------------------
// Global flags
// ---------------------------------------------------------------------------

#[test]
fn json_logs_go_to_stderr() {
    let output = sextant()
        .args(["--log-level", "info", "--log-format", "json", "export", "--units"])
        .arg(units("sandbox.yaml"))
        .assert()
        .success()
        .get_output()
        .clone();

    // Stdout stays a single JSON document.
    stdout_json(&output);
    let stderr = String::from_utf8(output.stderr).expect("stderr should be valid UTF-8");
    assert!(stderr.contains("\"event\":\"extraction_completed\""));
}

#[test]
fn unknown_log_format_exits_two() {
    sextant()
        .args(["--log-format", "xml", "validate", "--units"])
        .arg(units("sandbox.yaml"))
        .assert()
        .failure()
        .code(2);
}
