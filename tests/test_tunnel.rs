//! Integration tests for tunnel session supervision
//!
//! These drive real subprocesses through the session machinery, standing in
//! for the forwarding agent with small shell scripts.

use std::io::Write;
use std::time::Duration;

use hoplink::tunnel::{AgentCommand, TunnelSession};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn sh(script: &str) -> AgentCommand {
    AgentCommand::new("sh", vec!["-c".to_string(), script.to_string()])
}

/// True while `pid` names a live (unreaped) process.
fn process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

async fn wait_for_death(pid: u32) {
    for _ in 0..100 {
        if !process_alive(pid) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("agent process {} still running", pid);
}

/// Drain the session's event stream, bounding the whole read.
async fn collect_events(session: &mut TunnelSession) -> Vec<String> {
    let mut lines = Vec::new();
    loop {
        match timeout(Duration::from_secs(10), session.next_event()).await {
            Ok(Some(line)) => lines.push(line),
            Ok(None) => return lines,
            Err(_) => panic!("event stream did not close; got {:?}", lines),
        }
    }
}

#[tokio::test]
async fn test_stream_delivers_every_line_in_order_then_closes() {
    let mut session = TunnelSession::launch(
        sh("for i in $(seq 1 25); do echo line-$i; done"),
        CancellationToken::new(),
    )
    .unwrap();

    let lines = collect_events(&mut session).await;

    let expected: Vec<String> = (1..=25).map(|i| format!("line-{}", i)).collect();
    assert_eq!(lines, expected);
}

#[tokio::test]
async fn test_slow_consumer_stalls_but_loses_nothing() {
    // The bounded channel applies backpressure; a consumer draining slowly
    // must still see every line exactly once.
    let mut session = TunnelSession::launch(
        sh("for i in $(seq 1 10); do echo line-$i; done"),
        CancellationToken::new(),
    )
    .unwrap();

    let mut lines = Vec::new();
    while let Ok(Some(line)) = timeout(Duration::from_secs(10), session.next_event()).await {
        lines.push(line);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let expected: Vec<String> = (1..=10).map(|i| format!("line-{}", i)).collect();
    assert_eq!(lines, expected);
}

#[tokio::test]
async fn test_first_diagnostic_line_closes_stream_while_agent_lives() {
    let cancel = CancellationToken::new();
    let mut session = TunnelSession::launch(
        sh("echo 'session failed to open' >&2; sleep 30; echo late"),
        cancel.clone(),
    )
    .unwrap();
    let pid = session.pid().expect("agent pid");

    let lines = collect_events(&mut session).await;

    // The diagnostic line is delivered, closes the stream, and nothing
    // produced afterwards ever shows up.
    assert!(lines.contains(&"session failed to open".to_string()));
    assert!(!lines.contains(&"late".to_string()));

    // The agent itself is still running; ending the stream did not kill it.
    assert!(process_alive(pid));

    cancel.cancel();
    wait_for_death(pid).await;
}

#[tokio::test]
async fn test_empty_diagnostic_lines_are_not_terminal() {
    let mut session = TunnelSession::launch(
        sh("printf '\\n\\n' >&2; echo one; echo two"),
        CancellationToken::new(),
    )
    .unwrap();

    let lines = collect_events(&mut session).await;
    assert_eq!(lines, vec!["one", "two"]);
}

#[tokio::test]
async fn test_cancellation_closes_stream_and_kills_agent() {
    let cancel = CancellationToken::new();
    let mut session =
        TunnelSession::launch(sh("echo started; sleep 30"), cancel.clone()).unwrap();
    let pid = session.pid().expect("agent pid");

    // Let the agent get going, then revoke the session.
    assert_eq!(session.next_event().await.as_deref(), Some("started"));
    cancel.cancel();

    let closed = timeout(Duration::from_secs(5), async {
        while session.next_event().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "stream did not close after cancellation");

    wait_for_death(pid).await;
}

#[tokio::test]
async fn test_session_cancel_handle_is_equivalent() {
    let mut session =
        TunnelSession::launch(sh("sleep 30"), CancellationToken::new()).unwrap();
    let pid = session.pid().expect("agent pid");

    session.cancel();

    let closed = timeout(Duration::from_secs(5), async {
        while session.next_event().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok());

    wait_for_death(pid).await;
}

#[tokio::test]
async fn test_agent_script_from_file() {
    // The agent is an arbitrary executable; exercise launching one from a
    // path the way the real AWS CLI would be.
    let mut script = tempfile::NamedTempFile::new().unwrap();
    writeln!(script, "#!/bin/sh").unwrap();
    writeln!(script, "echo forwarding-ready").unwrap();
    script.flush().unwrap();

    let path = script.path().to_string_lossy().to_string();
    let mut session = TunnelSession::launch(
        AgentCommand::new("sh", vec![path]),
        CancellationToken::new(),
    )
    .unwrap();

    let lines = collect_events(&mut session).await;
    assert_eq!(lines, vec!["forwarding-ready"]);
}
