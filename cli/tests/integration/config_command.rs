//! Integration tests for `deckhand config`.
//!
//! All filesystem-touching tests set `DECKHAND_CONFIG` to a temp path so they
//! never read or write `~/.deckhand/config.yaml`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn deckhand() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("deckhand"));
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Returns a `TempDir` and the path string for a config file inside it.
fn temp_config_path() -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir
        .path()
        .join("config.yaml")
        .to_string_lossy()
        .into_owned();
    (dir, path)
}

#[test]
fn test_config_help_shows_subcommands() {
    deckhand()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("set"));
}

// ---------------------------------------------------------------------------
// `deckhand config show`
// ---------------------------------------------------------------------------

#[test]
fn test_config_show_lists_keys_and_defaults() {
    let (_dir, path) = temp_config_path();
    deckhand()
        .args(["config", "show"])
        .env("DECKHAND_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("state.bucket"))
        .stdout(predicate::str::contains("(not set)"))
        .stdout(predicate::str::contains("DECKHAND_CONFIG"));
}

#[test]
fn test_config_show_does_not_create_file() {
    let (_dir, path) = temp_config_path();
    deckhand()
        .args(["config", "show"])
        .env("DECKHAND_CONFIG", &path)
        .assert()
        .success();
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_config_show_json_includes_path() {
    let (_dir, path) = temp_config_path();
    let output = deckhand()
        .args(["--json", "config", "show"])
        .env("DECKHAND_CONFIG", &path)
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON");
    assert_eq!(value["path"], path.as_str());
    assert_eq!(value["config"]["pipeline"]["suffix"], "-pipeline");
}

// ---------------------------------------------------------------------------
// `deckhand config set` / `get`
// ---------------------------------------------------------------------------

#[test]
fn test_config_set_then_get() {
    let (_dir, path) = temp_config_path();
    deckhand()
        .args(["config", "set", "state.bucket", "acme-tfstate"])
        .env("DECKHAND_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Set state.bucket = acme-tfstate"));

    deckhand()
        .args(["config", "get", "state.bucket"])
        .env("DECKHAND_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::diff("acme-tfstate\n"));

    let content = std::fs::read_to_string(&path).expect("config written");
    assert!(content.contains("acme-tfstate"));
}

#[test]
fn test_config_get_unset_key_json_is_null() {
    let (_dir, path) = temp_config_path();
    let output = deckhand()
        .args(["--json", "config", "get", "aws.role_arn"])
        .env("DECKHAND_CONFIG", &path)
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON");
    assert_eq!(value["key"], "aws.role_arn");
    assert!(value["value"].is_null());
}

#[test]
fn test_config_set_unknown_key_fails() {
    let (_dir, path) = temp_config_path();
    deckhand()
        .args(["config", "set", "state.colour", "blue"])
        .env("DECKHAND_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting: state.colour"));
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_config_set_invalid_region_fails_with_config_code() {
    let (_dir, path) = temp_config_path();
    let output = deckhand()
        .args(["--json", "config", "set", "aws.region", "Mars North"])
        .env("DECKHAND_CONFIG", &path)
        .output()
        .expect("run");
    assert!(!output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON");
    assert_eq!(value["code"], "config");
}
