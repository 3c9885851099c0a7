//! Integration tests for the `nvtuner` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions and
//! error handling without a reachable router.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `nvtuner` binary with env isolation.
///
/// Clears all `NVTUNER_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn nvtuner_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("nvtuner");
    cmd.env("HOME", "/tmp/nvtuner-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/nvtuner-cli-test-nonexistent")
        .env_remove("NVTUNER_ROUTER")
        .env_remove("NVTUNER_HOST")
        .env_remove("NVTUNER_PORT")
        .env_remove("NVTUNER_USER")
        .env_remove("NVTUNER_KEY_DIR")
        .env_remove("NVTUNER_OUTPUT")
        .env_remove("NVTUNER_TIMEOUT")
        .env_remove("NVTUNER_USERNAME")
        .env_remove("NVTUNER_PASSWORD");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = nvtuner_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    nvtuner_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("probe")
            .and(predicate::str::contains("show"))
            .and(predicate::str::contains("usage"))
            .and(predicate::str::contains("set"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    nvtuner_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nvtuner"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    nvtuner_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    nvtuner_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    nvtuner_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = nvtuner_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_show_no_router() {
    nvtuner_cmd()
        .arg("show")
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("No router configured")
                .and(predicate::str::contains("nvtuner config init")),
        );
}

#[test]
fn test_unknown_router_profile() {
    nvtuner_cmd()
        .args(["--router", "missing", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_invalid_host_is_usage_error() {
    let output = nvtuner_cmd()
        .args(["--host", "999.1.1.1", "--user", "admin", "usage"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(
        text.contains("address"),
        "Expected error about the router address:\n{text}"
    );
}

#[test]
fn test_config_show_no_config() {
    // `config show` falls back to the default config when no file exists.
    nvtuner_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_invalid_output_format() {
    let output = nvtuner_cmd()
        .args(["--output", "invalid", "show"])
        .output()
        .unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid output format"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_set_requires_assignments() {
    let output = nvtuner_cmd().arg("set").output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(
        text.contains("NAME=VALUE"),
        "Expected missing argument hint:\n{text}"
    );
}

#[test]
fn test_set_rejects_malformed_assignment_before_connecting() {
    let output = nvtuner_cmd()
        .args(["--host", "192.168.1.1", "--user", "admin", "--key-dir", "/tmp", "set", "no-equals"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_show_name_conflicts_with_filter() {
    nvtuner_cmd()
        .args(["show", "wl0_ssid", "--filter", "wl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_config_subcommands_exist() {
    nvtuner_cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("list"))
                .and(predicate::str::contains("set-password")),
        );
}

#[test]
fn test_set_help_lists_split_modes() {
    nvtuner_cmd()
        .args(["set", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--dry-run")
                .and(predicate::str::contains("comma"))
                .and(predicate::str::contains("less-than")),
        );
}
