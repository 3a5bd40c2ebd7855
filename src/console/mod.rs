//! Downstream gRPC web console
//!
//! Once the tunnel has settled, dial the forwarded local port as a gRPC
//! channel, discover the services behind it via server reflection, and
//! serve a small web console listing them. Nothing in the resolve-select-
//! tunnel pipeline depends on this module; it is strictly downstream of a
//! successfully opened session.

pub mod reflection;
pub mod server;

pub use server::Console;

use tokio_util::sync::CancellationToken;
use tonic::transport::Endpoint;
use tracing::info;

use crate::errors::{HoplinkError, Result};

/// Dial the tunnel and serve the console until cancelled.
pub async fn attach(cancel: CancellationToken, forward_port: u16, web_port: u16) -> Result<()> {
    let addr = format!("http://127.0.0.1:{}", forward_port);
    info!(%addr, "dialing forwarded gRPC endpoint");

    let channel = Endpoint::from_shared(addr.clone())
        .map_err(|e| HoplinkError::Grpc(format!("invalid endpoint {}: {}", addr, e)))?
        .connect()
        .await
        .map_err(|e| HoplinkError::Grpc(format!("could not connect to {}: {}", addr, e)))?;

    let services = reflection::list_services(channel).await?;
    for name in &services {
        info!(service = %name, "discovered service");
    }

    let console = Console::bind(web_port, forward_port, &services).await?;
    eprintln!("Serving web console on http://127.0.0.1:{}", web_port);
    console.run(cancel).await
}
