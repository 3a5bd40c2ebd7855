//! Main execution logic
//!
//! Wires the pipeline together: resolve the service's endpoints, let the
//! operator pick one, open the tunnel session, then attach the web console
//! once the tunnel has settled. Configuration flows through as an explicit
//! value; errors from any stage propagate unchanged and abort everything
//! downstream of them.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::aws::{self, AwsCredentials};
use crate::catalog::build_catalog;
use crate::cli::Args;
use crate::console;
use crate::errors::Result;
use crate::inventory::EcsInventory;
use crate::select::{choose, InteractivePicker};
use crate::status::ExitStatus;
use crate::tunnel::TunnelSession;

/// Main entry point for the CLI.
///
/// Parses arguments, initialises logging and the async runtime, and maps
/// the program's outcome onto an exit status. Every pipeline error is
/// reported here, once.
pub fn run(args: Vec<String>, cancel: CancellationToken) -> ExitStatus {
    let parsed = match Args::try_parse_from(&args) {
        Ok(args) => args,
        Err(e) => {
            e.print().ok();
            return if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                ExitStatus::Success
            } else {
                ExitStatus::Error
            };
        }
    };

    init_tracing(parsed.debug);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    match runtime.block_on(program(parsed, cancel.clone())) {
        Ok(status) => status,
        Err(e) => {
            // Tear down the session (and its agent subprocess) before the
            // runtime is dropped.
            cancel.cancel();
            eprintln!("hoplink: {}", e);
            ExitStatus::Error
        }
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "hoplink=debug" } else { "hoplink=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// The resolve-select-tunnel-console pipeline.
pub async fn program(args: Args, cancel: CancellationToken) -> Result<ExitStatus> {
    if args.debug {
        eprintln!("Debug: {:?}", args);
    }

    let credentials = AwsCredentials::from_env()?;
    let region = aws::resolve_region(args.region.as_deref());
    let inventory = EcsInventory::new(credentials, region);

    let catalog = build_catalog(
        &inventory,
        &args.cluster,
        &args.hopper_app,
        &args.hopper_service,
    )
    .await?;
    info!(endpoints = catalog.len(), "built endpoint catalog");

    let endpoint = choose(&InteractivePicker, &catalog)?;
    info!(endpoint = %endpoint, "selected endpoint");

    let mut session = TunnelSession::open(cancel.clone(), args.forward_port, &endpoint)?;
    eprintln!(
        "Forwarding 127.0.0.1:{} to {} port {}",
        args.forward_port, endpoint.instance_id, endpoint.host_port
    );

    // Relay agent output while the rest of the pipeline proceeds. The relay
    // ends when the session's event stream closes.
    let relay = tokio::spawn(async move {
        while let Some(line) = session.next_event().await {
            println!("{}", line);
        }
    });

    // The agent emits no readiness signal; give the tunnel a fixed settle
    // window before dialing it.
    tokio::select! {
        _ = tokio::time::sleep(args.settle_delay) => {}
        _ = cancel.cancelled() => {
            let _ = relay.await;
            return Ok(ExitStatus::Interrupted);
        }
    }

    console::attach(cancel.clone(), args.forward_port, args.web_port).await?;

    let _ = relay.await;
    Ok(if cancel.is_cancelled() {
        ExitStatus::Interrupted
    } else {
        ExitStatus::Success
    })
}
