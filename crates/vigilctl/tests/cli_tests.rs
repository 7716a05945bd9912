//! CLI integration tests for vigilctl
//!
//! Tests the CLI surface:
//! - vigilctl check --snapshot FILE   replayed pass, console and JSON output
//! - vigilctl config                  effective / default TOML, --write
//! - vigilctl readings -o FILE        capture that `check --snapshot` can replay
//! - exit codes for config and snapshot failures
//!
//! Every run gets its own HOME and XDG_CONFIG_HOME so a developer's config
//! cannot leak in.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use vigil_common::{MetricKind, SensorSource, SnapshotSource, VigilConfig};

const CPU_RAM_SNAPSHOT: &str = r#"{
  "captured_at": "2025-06-01T08:30:00Z",
  "source": "linux",
  "readings": [
    {"kind": "cpu_usage", "value": 90.0, "available": true},
    {"kind": "ram_usage", "value": 50.0, "available": true},
    {"kind": "gpu_usage", "value": null, "available": false, "detail": "no GPU load counter found"}
  ]
}"#;

fn vigilctl(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vigilctl"))
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("VIGIL_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute vigilctl")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn write_snapshot(dir: &TempDir) -> String {
    let path = dir.path().join("pass.json");
    std::fs::write(&path, CPU_RAM_SNAPSHOT).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    let output = vigilctl(home.path(), &["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("vigilctl "));
}

#[test]
fn test_check_snapshot_console() {
    let home = TempDir::new().unwrap();
    let snapshot = write_snapshot(&home);
    let output = vigilctl(home.path(), &["check", "--snapshot", &snapshot, "--no-log"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("[FINDINGS]"));
    assert!(text.contains("[CRIT] CPU"));
    assert!(text.contains("[WARN] Memory"));
    assert!(text.contains("Score:     26/100"));
    assert!(!text.contains('\u{1b}'), "NO_COLOR must disable escapes");
}

#[test]
fn test_check_snapshot_json_and_log_file() {
    let home = TempDir::new().unwrap();
    let snapshot = write_snapshot(&home);
    let logs = home.path().join("logs");
    let output = vigilctl(
        home.path(),
        &[
            "check",
            "--snapshot",
            &snapshot,
            "--json",
            "--log-dir",
            logs.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["score"], 26);
    assert_eq!(value["verdict"], "poor");
    assert_eq!(value["findings"][0]["category"], "CPU");
    assert_eq!(value["findings"][0]["status"], "Critical");

    let files: Vec<String> = std::fs::read_dir(&logs)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("system_health_report_"));
    assert!(files[0].ends_with(".json"));
}

#[test]
fn test_missing_config_exits_78() {
    let home = TempDir::new().unwrap();
    let output = vigilctl(home.path(), &["--config", "/nonexistent/vigil.toml", "config"]);
    assert_eq!(output.status.code(), Some(78));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[ERROR]"));
}

#[test]
fn test_bad_snapshot_exits_1() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("garbage.json");
    std::fs::write(&path, "not json").unwrap();
    let output = vigilctl(
        home.path(),
        &["check", "--snapshot", path.to_str().unwrap(), "--no-log"],
    );
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_config_default_and_write() {
    let home = TempDir::new().unwrap();
    let output = vigilctl(home.path(), &["config", "--default"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("[weights]"));
    assert!(text.contains("[thresholds]"));
    assert!(text.contains("cpu_usage = 0.3"));

    let path = home.path().join(".config/vigil/config.toml");
    let output = vigilctl(home.path(), &["config", "--write", path.to_str().unwrap()]);
    assert!(output.status.success());
    let loaded = VigilConfig::load_from_path(&path).unwrap();
    assert_eq!(loaded, VigilConfig::default());
}

#[test]
fn test_user_config_is_picked_up() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".config/vigil");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "[report]\nwrite_log = false\n\n[collection]\npass_deadline_ms = 4321\n",
    )
    .unwrap();

    let output = vigilctl(home.path(), &["config"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("pass_deadline_ms = 4321"));
    assert!(text.contains("write_log = false"));
}

#[test]
fn test_readings_capture_replays() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("captured.json");
    let output = vigilctl(home.path(), &["readings", "-o", path.to_str().unwrap()]);
    assert!(output.status.success());

    let source = SnapshotSource::load(&path).unwrap();
    assert!(source.probes().contains(&MetricKind::CpuUsage));

    let replay = vigilctl(
        home.path(),
        &["check", "--snapshot", path.to_str().unwrap(), "--json", "--no-log"],
    );
    assert!(replay.status.success());
}
