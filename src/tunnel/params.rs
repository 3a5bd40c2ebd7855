//! Forwarding-agent session parameters
//!
//! The SSM port-forwarding document takes its ports as JSON string arrays;
//! field names and value shape are fixed by the document schema.

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Parameter payload for a port-forwarding session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParameters {
    /// Port on the target instance
    #[serde(rename = "portNumber")]
    pub port_number: Vec<String>,
    /// Port on the operator's machine
    #[serde(rename = "localPortNumber")]
    pub local_port_number: Vec<String>,
}

impl SessionParameters {
    pub fn new(host_port: u16, local_port: u16) -> Self {
        Self {
            port_number: vec![host_port.to_string()],
            local_port_number: vec![local_port.to_string()],
        }
    }

    /// Serialize to the `--parameters` argument value.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
