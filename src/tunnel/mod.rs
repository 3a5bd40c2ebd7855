//! Forwarding-agent session supervision
//!
//! A [`TunnelSession`] owns one forwarding-agent subprocess plus the merged
//! stream of its output lines. The stream closes exactly once - on agent
//! exit, on the first non-empty diagnostic line, or on cancellation - and
//! closing it is the sole "session ended" signal.

pub mod params;
pub mod session;

pub use params::SessionParameters;
pub use session::{AgentCommand, TunnelSession};
