//! Common test utilities for hoplink integration tests

use std::process::Command;

/// Result of running the hoplink CLI
#[derive(Debug)]
pub struct CliResponse {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Raw exit code
    pub exit_code: i32,
}

/// Run the hoplink binary with AWS credentials scrubbed from the
/// environment, so tests never pick up a developer's real login.
pub fn hoplink_without_credentials(args: &[&str]) -> CliResponse {
    let output = Command::new(env!("CARGO_BIN_EXE_hoplink"))
        .args(args)
        .env_remove("AWS_ACCESS_KEY_ID")
        .env_remove("AWS_ACCESS_KEY")
        .env_remove("AWS_SECRET_ACCESS_KEY")
        .env_remove("AWS_SECRET_KEY")
        .env_remove("AWS_SESSION_TOKEN")
        .output()
        .expect("failed to run hoplink binary");

    CliResponse {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    }
}
