use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::{TempDir, tempdir};

// Small frames keep the simulated pipeline fast.
fn write_valid_config(dir: &TempDir) -> PathBuf {
    let toml = r#"
[camera]
width = 160
height = 120
retries = 1
retry_delay_ms = 0

[control]
kp = 0.5
ki = 0.05
setpoint = 6
max_pump_duty = 80

[timing]
metrics_hz = 10
control_hz = 10
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn froth(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("froth").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

fn write_froth_png(dir: &TempDir, count: u32) -> PathBuf {
    let frame = froth_hardware::render_froth(200, 150, count, 9, 4);
    let path = dir.path().join("froth.png");
    frame.save(&path).unwrap();
    path
}

#[rstest]
#[case(&["--help"], "Usage:")]
#[case(&["analyze", "--help"], "IMAGE")]
fn help_is_printed(#[case] args: &[&str], #[case] needle: &str) {
    let mut cmd = Command::cargo_bin("froth").unwrap();
    cmd.args(args);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(needle));
}

#[test]
fn analyze_prints_text_summary() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let img = write_froth_png(&dir, 8);
    froth(&cfg)
        .arg("analyze")
        .arg(&img)
        .assert()
        .success()
        .stdout(predicate::str::contains("bubbles: 8"))
        .stdout(predicate::str::contains("froth_stability:"));
}

#[test]
fn analyze_json_is_machine_readable() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let img = write_froth_png(&dir, 8);
    let out = froth(&cfg)
        .arg("--json")
        .arg("analyze")
        .arg(&img)
        .output()
        .unwrap();
    assert!(out.status.success());
    let line = String::from_utf8(out.stdout).unwrap();
    let v: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(v["metrics"]["bubble_count"], 8);
    assert_eq!(v["bubbles"].as_array().unwrap().len(), 8);
    assert!(v["degenerate"].is_null());
    let stability = v["metrics"]["froth_stability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&stability));
}

#[test]
fn analyze_blank_image_reports_no_segmentation() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let img = write_froth_png(&dir, 0);
    froth(&cfg)
        .arg("analyze")
        .arg(&img)
        .assert()
        .success()
        .stdout(predicate::str::contains("no_contrast"))
        .stdout(predicate::str::contains("bubbles: 0"));
}

#[test]
fn analyze_missing_image_fails_with_hint() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    froth(&cfg)
        .arg("analyze")
        .arg(dir.path().join("nope.png"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("image could not be loaded"));
}

#[test]
fn self_check_passes_in_simulation() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    froth(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("camera: ok"))
        .stdout(predicate::str::contains("estop: clear"));
}

#[test]
fn run_for_a_fixed_duration_then_releases() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let out = froth(&cfg)
        .args(["--json", "run", "--duration-s", "1", "--auto", "--report-every-s", "0"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout).unwrap();
    let last = stdout.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["status"]["running"], false);
    assert_eq!(v["status"]["initialized"], false);
    assert_eq!(v["status"]["pump_mode"], "auto");
    assert_eq!(v["status"]["pump_duty"], 0.0);
    assert_eq!(v["metrics"]["available"], true);
}

#[rstest]
#[case("[control]\nkp = -1.0\n", "control.kp must be >= 0")]
#[case("[vision]\nblur_kernel = 4\n", "blur_kernel must be a positive odd number")]
#[case("[pins]\npump = 13\n", "assigned twice")]
fn invalid_config_is_rejected(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, toml).unwrap();
    froth(&path)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_names_the_flag() {
    let dir = tempdir().unwrap();
    froth(&dir.path().join("absent.toml"))
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--config"));
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[camera\nwidth = ").unwrap();
    let out = froth(&path).args(["--json", "self-check"]).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
    let v: serde_json::Value =
        serde_json::from_str(String::from_utf8(out.stderr).unwrap().lines().last().unwrap())
            .unwrap();
    assert_eq!(v["reason"], "Config");
}
