//! Tunnel session lifecycle
//!
//! One session = one subprocess, two line readers, one bounded event
//! channel. A background supervisor owns the child process handle and is
//! the only place that closes the event channel, so closure happens exactly
//! once no matter which terminal condition fires first.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::params::SessionParameters;
use crate::catalog::Endpoint;
use crate::errors::{HoplinkError, Result};

/// SSM document that performs the instance-side port forward.
const FORWARD_DOCUMENT: &str = "HopperSSMPortForward";

/// The external forwarding agent invocation.
///
/// The default agent is the AWS CLI's `ssm start-session`; tests substitute
/// arbitrary programs to drive the session machinery without AWS.
#[derive(Debug, Clone)]
pub struct AgentCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl AgentCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build the SSM port-forwarding invocation for `endpoint`.
    pub fn forward(endpoint: &Endpoint, local_port: u16) -> Result<Self> {
        let params = SessionParameters::new(endpoint.host_port, local_port).to_json()?;
        Ok(Self::new(
            "aws",
            vec![
                "ssm".to_string(),
                "start-session".to_string(),
                "--target".to_string(),
                endpoint.instance_id.clone(),
                "--document-name".to_string(),
                FORWARD_DOCUMENT.to_string(),
                "--parameters".to_string(),
                params,
            ],
        ))
    }
}

/// A line read off one of the agent's output channels.
enum RawLine {
    /// Primary output
    Output(String),
    /// First non-empty diagnostic line; terminal for the stream
    Diagnostic(String),
}

/// One live forwarding subprocess and its merged output stream.
///
/// The caller owns the session's lifetime: cancel the token passed to
/// [`TunnelSession::open`] (or call [`TunnelSession::cancel`]) to terminate
/// the agent, or drain events until the stream closes on its own. There is
/// no implicit timeout and no retry.
#[derive(Debug)]
pub struct TunnelSession {
    events: mpsc::Receiver<String>,
    cancel: CancellationToken,
    pid: Option<u32>,
}

impl TunnelSession {
    /// Start a forwarding session from `local_port` to `endpoint`.
    ///
    /// Returns as soon as the agent is spawned and its readers are attached;
    /// forwarding readiness is not awaited and no readiness signal exists -
    /// callers either probe the local port or tolerate a settle delay.
    pub fn open(
        cancel: CancellationToken,
        local_port: u16,
        endpoint: &Endpoint,
    ) -> Result<Self> {
        let command = AgentCommand::forward(endpoint, local_port)?;
        Self::launch(command, cancel)
    }

    /// Spawn an arbitrary agent command and supervise it as a session.
    pub fn launch(command: AgentCommand, cancel: CancellationToken) -> Result<Self> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                HoplinkError::Launch(format!("could not start {}: {}", command.program, e))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            HoplinkError::Launch("could not attach to agent stdout".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            HoplinkError::Launch("could not attach to agent stderr".to_string())
        })?;

        let pid = child.id();
        debug!(program = %command.program, pid, "forwarding agent started");

        // Capacity 1 on both hops: producers block until the consumer
        // drains, so a slow consumer stalls the agent's pipes instead of
        // buffering unboundedly.
        let (raw_tx, raw_rx) = mpsc::channel::<RawLine>(1);
        let (events_tx, events_rx) = mpsc::channel::<String>(1);

        tokio::spawn(pump_output(stdout, raw_tx.clone()));
        tokio::spawn(pump_diagnostic(stderr, raw_tx));
        tokio::spawn(supervise(child, raw_rx, events_tx, cancel.clone()));

        Ok(Self {
            events: events_rx,
            cancel,
            pid,
        })
    }

    /// Receive the next output line. Returns `None` once the stream has
    /// closed; the stream is finite and not restartable.
    pub async fn next_event(&mut self) -> Option<String> {
        self.events.recv().await
    }

    /// Consume the session, handing out its event receiver.
    pub fn events(self) -> mpsc::Receiver<String> {
        self.events
    }

    /// Terminate the session: kills the agent and closes the event stream.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// OS pid of the agent process, if it is still known to be spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Forward every primary-output line, in order, until end-of-input.
async fn pump_output<R: AsyncRead + Unpin>(stream: R, tx: mpsc::Sender<RawLine>) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(RawLine::Output(line)).await.is_err() {
            return;
        }
    }
}

/// Watch the diagnostic channel. Empty lines are ignored; the first
/// non-empty line is forwarded and ends the watch - any diagnostic output
/// is treated as a terminal signal for the stream, even if the agent keeps
/// running.
async fn pump_diagnostic<R: AsyncRead + Unpin>(stream: R, tx: mpsc::Sender<RawLine>) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.is_empty() {
            continue;
        }
        let _ = tx.send(RawLine::Diagnostic(line)).await;
        return;
    }
}

/// Own the child for the whole session: merge reader output into the event
/// channel, close the channel exactly once on any terminal condition, then
/// hold the child until it exits or the session is cancelled, and reap it.
async fn supervise(
    mut child: Child,
    mut raw: mpsc::Receiver<RawLine>,
    events: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    let mut cancelled = false;
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => {
                cancelled = true;
                break;
            }
            line = raw.recv() => line,
        };

        match line {
            Some(RawLine::Output(text)) => {
                // Forwarding can block on a slow consumer; cancellation must
                // still get through.
                let sent = tokio::select! {
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    sent = events.send(text) => sent,
                };
                // A closed receiver means the consumer is gone; the session
                // ends with it.
                if sent.is_err() {
                    break;
                }
            }
            Some(RawLine::Diagnostic(text)) => {
                tokio::select! {
                    _ = cancel.cancelled() => cancelled = true,
                    _ = events.send(text) => {}
                }
                break;
            }
            // Both readers hit end-of-input.
            None => break,
        }
    }

    // Sole closure point for the event stream.
    drop(events);
    drop(raw);

    if !cancelled {
        // Stream is closed but the agent may still be running (diagnostic
        // termination); keep holding it until it exits or the caller
        // cancels the session.
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = child.wait() => {}
        }
    }

    let _ = child.start_kill();
    let _ = child.wait().await;
    debug!("forwarding agent reaped");
}
