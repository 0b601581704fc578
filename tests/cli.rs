//! End-to-end checks of the built binary that need no network.

use std::fs;
use std::process::Command;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_image-harvester"))
}

#[test]
fn zero_pages_reports_empty_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out_dir = dir.path().join("images");
    let settings = dir.path().join("settings.json");
    fs::write(
        &settings,
        format!(
            r#"{{"base_url": "http://127.0.0.1:9/", "item": "cats", "out_dir": {:?}, "total_pages": 0}}"#,
            out_dir.display().to_string()
        ),
    )
    .expect("write settings");

    let output = binary()
        .args(["--mode", "sync", "--process", "2", "--settings"])
        .arg(&settings)
        .output()
        .expect("failed to run binary");

    assert!(
        output.status.success(),
        "exited with {:?}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "Done, success: 0/0, failure: 0/0");
    // The output directory is created even when there is nothing to fetch
    assert!(out_dir.is_dir());
}

#[test]
fn zero_pages_json_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");
    fs::write(
        &settings,
        format!(
            r#"{{"base_url": "http://127.0.0.1:9/", "item": "cats", "out_dir": {:?}, "total_pages": 0}}"#,
            dir.path().join("out").display().to_string()
        ),
    )
    .expect("write settings");

    let output = binary()
        .arg("--json")
        .arg("--settings")
        .arg(&settings)
        .output()
        .expect("failed to run binary");

    assert!(output.status.success());
    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("summary is JSON");
    assert_eq!(summary["total"], 0);
    assert_eq!(summary["failed"], 0);
}

#[test]
fn missing_settings_file_exits_with_2() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = binary()
        .arg("--settings")
        .arg(dir.path().join("nope.json"))
        .output()
        .expect("failed to run binary");

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nope.json"), "stderr was: {stderr}");
}
