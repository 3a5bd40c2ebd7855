//! hoplink binary entry point.

use std::sync::atomic::{AtomicBool, Ordering};

use hoplink::core;
use hoplink::status::ExitStatus;
use tokio_util::sync::CancellationToken;

/// Entry point - wires Ctrl+C into the root cancellation token and calls core::run()
///
/// Returns ExitStatus directly, which implements std::process::Termination.
fn main() -> ExitStatus {
    let cancel = CancellationToken::new();

    // First Ctrl+C cancels the session so the forwarding agent is terminated
    // and reaped; a second Ctrl+C force-exits without cleanup.
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nInterrupted");

            static SECOND_CTRL_C: AtomicBool = AtomicBool::new(false);
            if SECOND_CTRL_C.swap(true, Ordering::SeqCst) {
                std::process::exit(ExitStatus::Interrupted as i32);
            }
            cancel.cancel();
        })
        .ok();
    }

    let args: Vec<String> = std::env::args().collect();
    core::run(args, cancel)
}
