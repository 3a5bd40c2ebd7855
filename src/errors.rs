//! Error types for hoplink

use thiserror::Error;

/// Main error type for hoplink
#[derive(Error, Debug)]
pub enum HoplinkError {
    #[error("could not find any running tasks in cluster {cluster} with service name {service}")]
    NotFound { cluster: String, service: String },

    #[error("found {count} {entity} records for {id}, expected exactly one")]
    Consistency {
        entity: &'static str,
        id: String,
        count: usize,
    },

    #[error("{entity} {id} has no {field}")]
    IncompleteData {
        entity: &'static str,
        id: String,
        field: &'static str,
    },

    #[error("endpoint selection aborted")]
    SelectionAborted,

    #[error("failed to launch forwarding agent: {0}")]
    Launch(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("gRPC error: {0}")]
    Grpc(String),
}

// Inventory API failures below the HTTP layer are all transport errors to us.
impl From<reqwest::Error> for HoplinkError {
    fn from(err: reqwest::Error) -> Self {
        HoplinkError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HoplinkError>;
