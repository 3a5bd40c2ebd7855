//! Exit status codes for the CLI
//!
//! hoplink follows standard Unix exit code conventions:
//! - 0: Success
//! - 1: Any error (inventory lookup, selection, tunnel, console)
//! - 130: User interrupted (Ctrl+C, standard SIGINT exit code)
//!
//! Every top-level failure maps to exit code 1; callers that need to
//! distinguish failure classes should read stderr.

use std::process::{ExitCode, Termination};

/// Exit status codes following standard Unix conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// Tunnel and console ran to completion
    Success = 0,
    /// Any error along the resolve-select-tunnel pipeline
    Error = 1,
    /// User interrupted (Ctrl+C) - standard SIGINT code
    Interrupted = 130,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}

impl Termination for ExitStatus {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}
