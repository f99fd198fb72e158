use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_config(contents: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    path.push(format!("voidwatch-cli-test-{nanos}.toml"));
    fs::write(&path, contents).expect("write temp config");
    path
}

fn voidwatch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_voidwatch"))
        .args(args)
        .output()
        .expect("run voidwatch")
}

fn parse_stdout(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is one JSON document")
}

#[test]
fn cli_returns_nonzero_on_config_error() {
    let path = write_temp_config("[refresh]\ntick_secs = 0\n");
    let output = Command::new(env!("CARGO_BIN_EXE_voidwatch"))
        .args(["check", "config", "--config"])
        .arg(&path)
        .output()
        .expect("run voidwatch");
    let _ = fs::remove_file(&path);

    assert!(!output.status.success(), "Expected nonzero exit code");

    // Check both stdout and stderr for the error message
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{stdout}{stderr}");
    assert!(
        combined.contains("tick_secs"),
        "Expected error naming the field.\nstdout: {stdout}\nstderr: {stderr}"
    );
}

#[test]
fn scan_json_is_a_single_parseable_document() {
    let doc = parse_stdout(&voidwatch(&["--json", "scan"]));
    assert_eq!(doc["type"], "scan");

    let opportunities = doc["payload"]["opportunities"]
        .as_array()
        .expect("opportunities array");
    assert!(!opportunities.is_empty());
    assert!(
        doc["payload"]["routes_considered"].as_u64().unwrap() >= opportunities.len() as u64
    );
}

#[test]
fn stats_json_carries_derived_statistics() {
    let doc = parse_stdout(&voidwatch(&["--json", "stats", "--days", "7"]));
    assert_eq!(doc["type"], "statistics");

    let stats = &doc["payload"]["statistics"];
    assert_eq!(stats["type_id"], 34);
    assert_eq!(stats["region"], 10_000_002);
    assert!(stats["order_count"].as_u64().unwrap() > 0);
    assert!(doc["payload"]["cached_key"].is_null());
}

#[test]
fn cache_status_json_reflects_the_seeded_demo_cache() {
    let doc = parse_stdout(&voidwatch(&["--json", "cache", "status"]));
    assert_eq!(doc["type"], "cache-status");

    let entries = doc["payload"]["entries"].as_array().expect("entries array");
    assert_eq!(entries.len(), 20);
    assert!(doc["payload"]["total_bytes"].as_u64().unwrap() > 0);
    assert_eq!(doc["payload"]["metrics"]["inserts"].as_u64().unwrap(), 20);
}
