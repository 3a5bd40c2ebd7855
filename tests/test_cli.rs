//! Integration tests for the CLI surface

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn hoplink() -> Command {
    Command::cargo_bin("hoplink").unwrap()
}

#[test]
fn test_help_lists_required_flags() {
    hoplink()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--hopper-app")
                .and(predicate::str::contains("--hopper-service"))
                .and(predicate::str::contains("--web-port"))
                .and(predicate::str::contains("--forward-port"))
                .and(predicate::str::contains("--settle-delay")),
        );
}

#[test]
fn test_version_flag() {
    hoplink()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hoplink"));
}

#[test]
fn test_missing_required_flag_fails_with_usage_error() {
    // Top-level failures exit 1, including argument validation.
    hoplink()
        .args([
            "--hopper-app",
            "consumer-search-service",
            "--hopper-service",
            "web",
            "--web-port",
            "3000",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--forward-port"));
}

#[test]
fn test_invalid_settle_delay_fails() {
    hoplink()
        .args([
            "--hopper-app",
            "a",
            "--hopper-service",
            "s",
            "--web-port",
            "3000",
            "--forward-port",
            "3100",
            "--settle-delay",
            "not-a-duration",
        ])
        .assert()
        .code(1);
}

#[test]
fn test_missing_credentials_abort_before_any_lookup() {
    let response = common::hoplink_without_credentials(&[
        "--hopper-app",
        "consumer-search-service",
        "--hopper-service",
        "web",
        "--web-port",
        "3000",
        "--forward-port",
        "3100",
    ]);

    assert_eq!(response.exit_code, 1, "stderr: {}", response.stderr);
    assert!(
        response.stderr.contains("AWS_ACCESS_KEY_ID"),
        "stderr should name the missing variable: {}",
        response.stderr
    );
}
