//! CLI end-to-end tests
//!
//! Tests for the vidstage command-line interface. None of these reach a
//! real provider.

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the vidstage binary, isolated from ambient config and
/// credentials.
#[allow(deprecated)]
fn vidstage_cmd(cwd: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("vidstage").unwrap();
    cmd.current_dir(cwd)
        .env("HOME", cwd)
        .env_remove("OPENAI_API_KEY")
        .env_remove("VEO_ACCESS_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    let dir = tempdir().unwrap();
    vidstage_cmd(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_lists_commands() {
    let dir = tempdir().unwrap();
    vidstage_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compose"))
        .stdout(predicate::str::contains("before-after"))
        .stdout(predicate::str::contains("download"));
}

#[test]
fn test_cli_version_command() {
    let dir = tempdir().unwrap();
    vidstage_cmd(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vidstage"));
}

#[test]
fn test_cli_validate_defaults() {
    let dir = tempdir().unwrap();
    vidstage_cmd(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("720x1280"));
}

#[test]
fn test_cli_validate_config_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("vidstage.toml");
    fs::write(&config, "[generation]\nprovider = \"veo\"\n\n[veo]\nproject = \"demo\"\n").unwrap();

    vidstage_cmd(dir.path())
        .args(["validate", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Provider: veo"));
}

#[test]
fn test_cli_validate_rejects_bad_size() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[canvas]\nsize = \"720\"\n").unwrap();

    vidstage_cmd(dir.path())
        .args(["--config", config.to_str().unwrap(), "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config error"));
}

#[test]
fn test_cli_compose_writes_png() {
    let dir = tempdir().unwrap();
    let before = common::write_image(dir.path(), "a.png", 300, 200, [10, 200, 10]);
    let after = common::write_image(dir.path(), "b.png", 200, 300, [200, 10, 10]);
    let out = dir.path().join("out.png");

    vidstage_cmd(dir.path())
        .args(["compose", "--size", "480x854", "--output"])
        .arg(&out)
        .arg("--before")
        .arg(&before)
        .arg("--after")
        .arg(&after)
        .assert()
        .success()
        .stdout(predicate::str::contains("480x854"));

    let image = image::open(&out).unwrap();
    assert_eq!((image.width(), image.height()), (480, 854));
}

#[test]
fn test_cli_compose_missing_input_is_decode_error() {
    let dir = tempdir().unwrap();
    let after = common::write_image(dir.path(), "b.png", 64, 64, [0, 0, 0]);

    vidstage_cmd(dir.path())
        .args(["compose", "--before", "missing.png", "--after"])
        .arg(&after)
        .assert()
        .failure()
        .stderr(predicate::str::contains("decode error"));
}

#[test]
fn test_cli_generate_without_credentials_fails() {
    let dir = tempdir().unwrap();
    vidstage_cmd(dir.path())
        .args(["generate", "--prompt", "a calm lake"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_cli_rejects_unknown_provider() {
    let dir = tempdir().unwrap();
    vidstage_cmd(dir.path())
        .args(["--provider", "runway", "status", "video_1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider"));
}
