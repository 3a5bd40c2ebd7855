//! CLI argument definitions using clap
//!
//! This module defines all command-line arguments for hoplink.

use clap::Parser;
use std::time::Duration;

/// Open a port-forwarding tunnel from your local machine to a service task
/// on the staging cluster.
///
/// You provide the Hopper app and service name; hoplink tracks down the
/// running tasks behind it, where they are hosted and which ports they
/// expose, then starts an SSM port-forwarding session to the one you pick
/// and serves a gRPC web console over the forwarded port.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hoplink",
    version,
    about = "Open a tunnel from your local machine to a service task on the staging cluster",
    after_help = "Example:\n  hoplink --hopper-app consumer-search-service --hopper-service web \\\n          --forward-port 3100 --web-port 3000"
)]
pub struct Args {
    /// Hopper application name, e.g. consumer-search-service
    #[arg(long, value_name = "APP")]
    pub hopper_app: String,

    /// Hopper service name within the application, e.g. web
    #[arg(long, value_name = "SERVICE")]
    pub hopper_service: String,

    /// Local port the gRPC web console listens on
    #[arg(long, value_name = "PORT")]
    pub web_port: u16,

    /// Local port the tunnel forwards to the selected task
    #[arg(long, value_name = "PORT")]
    pub forward_port: u16,

    /// Cluster to resolve tasks in
    #[arg(long, default_value = "staging", value_name = "CLUSTER")]
    pub cluster: String,

    /// AWS region (defaults to AWS_REGION / AWS_DEFAULT_REGION)
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// How long to let the tunnel settle before dialing the forwarded port
    #[arg(long, default_value = "10s", value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub settle_delay: Duration,

    /// Print debug information
    #[arg(long)]
    pub debug: bool,
}
