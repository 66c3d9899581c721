//! Integration tests for the deckhand CLI surface.
//!
//! Every test points `DECKHAND_HOME` at a temp dir so the registry and config
//! under `~/.deckhand` are never touched.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn deckhand(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("deckhand"));
    cmd.env("NO_COLOR", "1")
        .env("DECKHAND_HOME", home.path())
        .env_remove("DECKHAND_CONFIG")
        .env_remove("DECKHAND_YES")
        .env_remove("CI");
    cmd
}

fn home() -> TempDir {
    TempDir::new().expect("temp dir")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// --- Help and version ---

#[test]
fn test_no_args_shows_help_and_exits_two() {
    let home = home();
    deckhand(&home)
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Provision, track and tear down static sites and servers",
        ));
}

#[test]
fn test_help_lists_commands() {
    let home = home();
    let output = deckhand(&home).arg("--help").output().expect("run");
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for command in [
        "create",
        "update",
        "delete",
        "list",
        "deployments",
        "pipeline-status",
        "build-logs",
        "config",
    ] {
        assert!(help.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_create_help_lists_both_kinds() {
    let home = home();
    deckhand(&home)
        .args(["create", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("static-site"))
        .stdout(predicate::str::contains("server"));
}

#[test]
fn test_version_command_shows_version() {
    let home = home();
    deckhand(&home)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("deckhand 0.1.0"));
}

#[test]
fn test_version_command_json() {
    let home = home();
    let output = deckhand(&home)
        .args(["--json", "version"])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["version"], "0.1.0");
}

#[test]
fn test_no_color_env_accepts_conventional_values() {
    let home = home();
    for value in ["1", "true", "yes", ""] {
        deckhand(&home)
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("deckhand 0.1.0"));
    }
}

#[test]
fn test_no_color_flag_accepted() {
    let home = home();
    deckhand(&home)
        .env_remove("NO_COLOR")
        .args(["--no-color", "version"])
        .assert()
        .success();
}

#[test]
fn test_unknown_command_exits_with_error() {
    let home = home();
    deckhand(&home)
        .arg("launch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_delete_rejects_unknown_kind() {
    let home = home();
    deckhand(&home)
        .args(["delete", "lambda", "svc-0000000000000001", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// --- Registry reads ---

#[test]
fn test_list_on_empty_registry() {
    let home = home();
    deckhand(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No services found"));
    assert!(home.path().join("registry.redb").exists());
}

#[test]
fn test_list_json_on_empty_registry_is_empty_array() {
    let home = home();
    let output = deckhand(&home)
        .args(["list", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), serde_json::json!([]));
}

#[test]
fn test_groups_create_then_list() {
    let home = home();
    let created = deckhand(&home)
        .args(["--json", "groups", "create", "marketing"])
        .output()
        .expect("run");
    assert!(created.status.success());
    let group = stdout_json(&created);
    assert_eq!(group["name"], "marketing");
    assert!(group["id"].as_str().unwrap().starts_with("grp-"));

    let listed = deckhand(&home)
        .args(["--json", "groups", "list"])
        .output()
        .expect("run");
    assert!(listed.status.success());
    assert_eq!(stdout_json(&listed), serde_json::json!([group]));
}

#[test]
fn test_duplicate_group_is_a_conflict() {
    let home = home();
    deckhand(&home)
        .args(["groups", "create", "marketing"])
        .assert()
        .success();
    let output = deckhand(&home)
        .args(["--json", "groups", "create", "marketing"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["code"], "conflict");
}

#[test]
fn test_show_malformed_id_fails_validation() {
    let home = home();
    deckhand(&home)
        .args(["show", "docs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));

    let output = deckhand(&home)
        .args(["--json", "show", "docs"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let err = stdout_json(&output);
    assert_eq!(err["error"], true);
    assert_eq!(err["code"], "validation");
}

#[test]
fn test_show_unknown_id_is_not_found() {
    let home = home();
    let output = deckhand(&home)
        .args(["--json", "show", "svc-00000000000000ff"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["code"], "not_found");
}

// --- Provisioning preconditions ---

#[test]
fn test_create_without_state_bucket_is_a_config_error() {
    let home = home();
    let output = deckhand(&home)
        .args([
            "--json",
            "create",
            "static-site",
            "--name",
            "docs",
            "--region",
            "eu-west-1",
            "--repo",
            "acme/docs",
            "--build-command",
            "npm run build",
            "--publish-dir",
            "dist",
        ])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let err = stdout_json(&output);
    assert_eq!(err["code"], "config");
    assert!(err["message"].as_str().unwrap().contains("state.bucket"));
}

#[test]
fn test_delete_declined_in_non_interactive_mode() {
    let home = home();
    deckhand(&home)
        .env("DECKHAND_YES", "1")
        .args(["delete", "server", "svc-0000000000000001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled."));
}
