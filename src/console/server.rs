//! Web console HTTP server
//!
//! A deliberately small hand-rolled server: every request gets the same
//! page listing the services reachable over the tunnel. No routing, no
//! keep-alive.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::{HoplinkError, Result};

/// The web console bound to its listening socket.
pub struct Console {
    listener: TcpListener,
    page: Arc<String>,
}

impl Console {
    /// Bind the console to `127.0.0.1:<web_port>`. Port 0 asks the OS for
    /// an ephemeral port; `local_addr` reports what was bound.
    pub async fn bind(web_port: u16, forward_port: u16, services: &[String]) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", web_port))
            .await
            .map_err(|e| {
                HoplinkError::Transport(format!(
                    "could not bind web console port {}: {}",
                    web_port, e
                ))
            })?;

        Ok(Self {
            listener,
            page: Arc::new(render_page(forward_port, services)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the session is cancelled.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _peer)) => {
                            let page = Arc::clone(&self.page);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, &page).await {
                                    warn!(error = %e, "console connection error");
                                }
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "console accept error");
                        }
                    }
                }
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, page: &str) -> std::io::Result<()> {
    // Drain the request head; the response is the same for every route.
    let mut buf = [0u8; 4096];
    let _ = stream.read(&mut buf).await?;

    let response = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        page.len(),
        page
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Render the console page for the discovered services.
pub fn render_page(forward_port: u16, services: &[String]) -> String {
    let mut items = String::new();
    for service in services {
        items.push_str(&format!("    <li><code>{}</code></li>\n", service));
    }

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><title>hoplink console</title></head>\n\
         <body>\n\
         <h1>hoplink console</h1>\n\
         <p>Tunnel established. gRPC services reachable on\n\
         <code>127.0.0.1:{}</code>:</p>\n\
         <ul>\n{}</ul>\n\
         <p>Point a reflection-capable gRPC client at the address above.</p>\n\
         </body>\n\
         </html>\n",
        forward_port, items
    )
}
