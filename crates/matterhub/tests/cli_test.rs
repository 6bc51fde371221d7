//! Integration tests for the `matterhub` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! and the bridge, storage and preview commands against a temporary
//! storage directory.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `matterhub` binary with env isolation.
///
/// Clears all `MATTERHUB_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn matterhub_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("matterhub");
    cmd.env("HOME", "/tmp/matterhub-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/matterhub-cli-test-nonexistent")
        .env_remove("MATTERHUB_CONFIG")
        .env_remove("MATTERHUB_STORAGE_LOCATION")
        .env_remove("MATTERHUB_OUTPUT")
        .env_remove("MATTERHUB_LOG_LEVEL")
        .env_remove("RUST_LOG");
    cmd
}

/// A command bound to a throwaway config file and storage directory.
fn sandboxed(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = matterhub_cmd();
    cmd.arg("--config")
        .arg(dir.path().join("config.toml"))
        .arg("--storage-location")
        .arg(dir.path().join("store"));
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_file(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
    path.to_path_buf()
}

fn add_bridge(dir: &TempDir, id: &str, extra: &[&str]) {
    sandboxed(dir)
        .args(["bridges", "add", "--id", id, "--name", "Living room", "--port", "5540"])
        .args(extra)
        .assert()
        .success();
}

/// Bridge store as written by the first storage layout.
fn write_v1_store(dir: &TempDir) {
    let bridges = dir.path().join("store").join("bridges");
    write_file(&bridges.join("version.json"), "1");
    write_file(&bridges.join("ids.json"), r#""[\"b1\"]""#);
    write_file(
        &bridges.join("b1.json"),
        r#""{\"id\":\"b1\",\"name\":\"Old\",\"port\":5540,\"compatibility\":{},\"filter\":{\"include\":[],\"exclude\":[]},\"featureFlags\":{\"mimicHaCoverPercentage\":true}}""#,
    );
}

const ENTITY_DUMP: &str = r#"[
  {"entity_id": "light.kitchen", "state": {"state": "on", "attributes": {"supported_color_modes": ["onoff"]}}},
  {"entity_id": "binary_sensor.front_door", "state": {"state": "off", "attributes": {"device_class": "door"}}},
  {"entity_id": "switch.heater", "state": {"state": "off"}, "registry": {"hidden_by": "user"}},
  {"entity_id": "weather.home", "state": {"state": "sunny"}}
]"#;

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = matterhub_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    matterhub_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Matter")
            .and(predicate::str::contains("bridges"))
            .and(predicate::str::contains("storage"))
            .and(predicate::str::contains("preview")),
    );
}

#[test]
fn test_version_flag() {
    matterhub_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("matterhub"));
}

#[test]
fn test_completions_bash() {
    matterhub_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("matterhub"));
}

#[test]
fn test_completions_zsh() {
    matterhub_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef matterhub"));
}

#[test]
fn test_invalid_subcommand() {
    let output = matterhub_cmd().arg("frobnicate").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_invalid_output_format() {
    let output = matterhub_cmd()
        .args(["--output", "xml", "bridges", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("xml"), "Expected rejected value in output:\n{text}");
}

// ── Bridges ─────────────────────────────────────────────────────────

#[test]
fn test_bridges_list_empty_store() {
    let dir = TempDir::new().unwrap();
    sandboxed(&dir)
        .args(["--output", "json", "bridges", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_bridges_add_then_list_and_show() {
    let dir = TempDir::new().unwrap();
    add_bridge(
        &dir,
        "living",
        &["--include", "domain=light", "--exclude", "pattern=light.*_test", "--flag", "matter-fans"],
    );

    sandboxed(&dir)
        .args(["--output", "plain", "bridges", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("living"));

    let output = sandboxed(&dir)
        .args(["--output", "json", "bridges", "show", "living"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["port"], 5540);
    assert_eq!(shown["filter"]["include"][0]["type"], "domain");
    assert_eq!(shown["filter"]["exclude"][0]["value"], "light.*_test");
    assert_eq!(shown["featureFlags"]["matterFans"], true);
}

#[test]
fn test_bridges_add_generates_id_when_omitted() {
    let dir = TempDir::new().unwrap();
    let output = sandboxed(&dir)
        .args(["--output", "plain", "bridges", "add", "--name", "Office", "--port", "5541"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let id = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    assert_eq!(id.len(), 32, "Expected a generated id, got '{id}'");
}

#[test]
fn test_bridges_add_from_file() {
    let dir = TempDir::new().unwrap();
    let file = write_file(
        &dir.path().join("bridge.json"),
        r#"{"id": "from-file", "name": "File", "port": 5542,
            "filter": {"include": [{"type": "area", "value": "kitchen"}], "exclude": []}}"#,
    );
    sandboxed(&dir)
        .args(["bridges", "add", "--from-file"])
        .arg(file)
        .assert()
        .success();
    sandboxed(&dir)
        .args(["--output", "plain", "bridges", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-file"));
}

#[test]
fn test_bridges_add_rejects_unknown_matcher_kind() {
    let dir = TempDir::new().unwrap();
    let output = sandboxed(&dir)
        .args(["bridges", "add", "--id", "b", "--name", "B", "--port", "5540", "--include", "colour=red"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("colour"));
}

#[test]
fn test_bridges_add_rejects_invalid_port() {
    let dir = TempDir::new().unwrap();
    let output = sandboxed(&dir)
        .args(["bridges", "add", "--id", "b", "--name", "B", "--port", "0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_bridges_show_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let output = sandboxed(&dir)
        .args(["bridges", "show", "nope"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("bridges list"));
}

#[test]
fn test_bridges_remove_requires_yes_without_terminal() {
    let dir = TempDir::new().unwrap();
    add_bridge(&dir, "living", &[]);

    let output = sandboxed(&dir)
        .args(["bridges", "remove", "living"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    sandboxed(&dir)
        .args(["--yes", "bridges", "rm", "living"])
        .assert()
        .success();
    sandboxed(&dir)
        .args(["--output", "json", "bridges", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

// ── Storage ─────────────────────────────────────────────────────────

#[test]
fn test_storage_migrate_upgrades_v1_layout() {
    let dir = TempDir::new().unwrap();
    write_v1_store(&dir);

    sandboxed(&dir)
        .args(["--output", "plain", "storage", "status"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1"));

    sandboxed(&dir)
        .args(["--output", "json", "storage", "migrate"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"stored_version\": 4")
                .and(predicate::str::contains("\"bridges\": 1")),
        );

    let output = sandboxed(&dir)
        .args(["--output", "json", "bridges", "show", "b1"])
        .output()
        .unwrap();
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["featureFlags"]["coverDoNotInvertPercentage"], true);
    assert_eq!(shown["featureFlags"]["coverSwapOpenClose"], true);
    assert!(shown.get("compatibility").is_none());
}

#[test]
fn test_storage_from_newer_release_is_refused() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("store/bridges/version.json"), "9");

    let output = sandboxed(&dir)
        .args(["bridges", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5));
}

// ── Preview ─────────────────────────────────────────────────────────

#[test]
fn test_preview_classifies_every_entity() {
    let dir = TempDir::new().unwrap();
    add_bridge(&dir, "living", &[]);
    let entities = write_file(&dir.path().join("entities.json"), ENTITY_DUMP);

    let output = sandboxed(&dir)
        .args(["--output", "json", "preview", "living", "--entities"])
        .arg(&entities)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let status_of = |id: &str| {
        rows.as_array()
            .unwrap()
            .iter()
            .find(|row| row["entity_id"] == id)
            .map(|row| row["status"].as_str().unwrap().to_owned())
    };
    assert_eq!(status_of("light.kitchen").as_deref(), Some("exposed"));
    assert_eq!(status_of("binary_sensor.front_door").as_deref(), Some("exposed"));
    assert_eq!(status_of("switch.heater").as_deref(), Some("excluded"));
    assert_eq!(status_of("weather.home").as_deref(), Some("unsupported_domain"));
}

#[test]
fn test_preview_exposed_only_with_bridge_file() {
    let dir = TempDir::new().unwrap();
    let bridge = write_file(
        &dir.path().join("bridge.json"),
        r#"{"id": "tmp", "name": "Tmp", "port": 5540,
            "filter": {"include": [{"type": "domain", "value": "light"}], "exclude": []}}"#,
    );
    let entities = write_file(&dir.path().join("entities.json"), ENTITY_DUMP);

    sandboxed(&dir)
        .args(["--output", "plain", "preview", "--exposed-only", "--bridge-file"])
        .arg(&bridge)
        .arg("--entities")
        .arg(&entities)
        .assert()
        .success()
        .stdout(predicate::str::diff("light.kitchen\n"));
}

#[test]
fn test_preview_unknown_bridge_is_not_found() {
    let dir = TempDir::new().unwrap();
    let entities = write_file(&dir.path().join("entities.json"), "[]");
    let output = sandboxed(&dir)
        .args(["preview", "ghost", "--entities"])
        .arg(&entities)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_init_then_show() {
    let dir = TempDir::new().unwrap();
    sandboxed(&dir)
        .args(["config", "init", "--url", "http://ha.lan:8123", "--access-token-env", "HA_TOKEN"])
        .assert()
        .success();

    let output = sandboxed(&dir).args(["config", "init", "--url", "http://ha.lan:8123"]).output().unwrap();
    assert_eq!(output.status.code(), Some(6), "Expected existing config to be kept");

    sandboxed(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("http://ha.lan:8123")
                .and(predicate::str::contains("HA_TOKEN")),
        );
}

#[test]
fn test_config_init_rejects_non_http_url() {
    let dir = TempDir::new().unwrap();
    let output = sandboxed(&dir)
        .args(["config", "init", "--url", "ftp://ha.lan"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
}

#[test]
fn test_config_path_honours_override() {
    let dir = TempDir::new().unwrap();
    sandboxed(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_subcommands_exist() {
    for sub in [
        vec!["bridges", "--help"],
        vec!["storage", "--help"],
        vec!["preview", "--help"],
        vec!["config", "--help"],
    ] {
        matterhub_cmd().args(&sub).assert().success();
    }
}
