use std::future::Future;
use std::io;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::pidfile;
use super::spawn::{LaunchConfig, build_command, prepare_pid_file, record_pid};
use crate::error::{LaunchStep, ProcessError, Result};

/// Lines buffered between the output readers and the sink.
const OUTPUT_BUFFER: usize = 64;

/// Run `config` to completion, forwarding each line of its combined
/// stdout/stderr to `sink`, or return [`ProcessError::Interrupted`] as soon
/// as Ctrl+C is received.
///
/// An interrupt ends the wait only: the child keeps running and must be
/// stopped explicitly if that is wanted.
pub async fn run_process<S>(config: &LaunchConfig, sink: S) -> Result<()>
where
    S: FnMut(String) + Send + 'static,
{
    run_process_until(config, sink, interrupt_signal()).await
}

/// [`run_process`] with a caller-supplied interrupt. Whichever of `interrupt`
/// and the child's completion resolves first decides the outcome.
///
/// A configured pid file is handled as in
/// [`start_process`](super::start_process). It is removed once the child has
/// exited and kept when the wait is interrupted.
pub async fn run_process_until<S, F>(config: &LaunchConfig, sink: S, interrupt: F) -> Result<()>
where
    S: FnMut(String) + Send + 'static,
    F: Future<Output = ()>,
{
    let pid_file = prepare_pid_file(config)?;
    let mut command = Command::from(build_command(config)?);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let child = command
        .spawn()
        .map_err(|e| ProcessError::launch(LaunchStep::Spawn, &config.command, e))?;
    let pid = child.id();
    info!(pid, command = %config.command, "supervising process");
    if let Some(pid) = pid {
        record_pid(pid_file, pid, &config.command)?;
    }

    let name = config.command.clone();
    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(async move {
        let outcome = supervise(child, &name, sink).await;
        let _ = done_tx.send(outcome);
    });

    tokio::select! {
        outcome = done_rx => {
            if let Some(path) = pid_file
                && let Err(err) = pidfile::remove(path)
            {
                warn!(path = %path.display(), error = %err, "stale pid file left behind");
            }
            match outcome {
                Ok(result) => result,
                Err(_) => Err(ProcessError::launch(
                    LaunchStep::Wait,
                    &config.command,
                    io::Error::other("supervisor ended without reporting"),
                )),
            }
        }
        () = interrupt => {
            warn!(pid, command = %config.command, "interrupted; the process is left running");
            Err(ProcessError::Interrupted {
                command: config.command.clone(),
            })
        }
    }
}

/// Run a configured stop command and wait for it like [`run_process`].
pub async fn stop_service<S>(config: &LaunchConfig, sink: S) -> Result<()>
where
    S: FnMut(String) + Send + 'static,
{
    run_process(config, sink).await
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
pub async fn interrupt_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

async fn supervise<S>(mut child: Child, command: &str, mut sink: S) -> Result<()>
where
    S: FnMut(String),
{
    let (tx, mut rx) = mpsc::channel(OUTPUT_BUFFER);
    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, tx.clone());
    }
    drop(tx);

    // Ends once both streams are closed.
    while let Some(line) = rx.recv().await {
        sink(line);
    }

    let status = child
        .wait()
        .await
        .map_err(|e| ProcessError::launch(LaunchStep::Wait, command, e))?;
    debug!(command, %status, "process exited");
    if status.success() {
        Ok(())
    } else {
        Err(ProcessError::Exit {
            command: command.to_string(),
            status,
        })
    }
}

fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut segments = BufReader::new(reader).split(b'\n');
        loop {
            match segments.next_segment().await {
                Ok(Some(mut bytes)) => {
                    if bytes.last() == Some(&b'\r') {
                        bytes.pop();
                    }
                    let line = String::from_utf8_lossy(&bytes).into_owned();
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "reading process output failed");
                    break;
                }
            }
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;

    fn collector() -> (Arc<Mutex<Vec<String>>>, impl FnMut(String) + Send + 'static) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        (lines, move |line| sink_lines.lock().unwrap().push(line))
    }

    #[tokio::test]
    async fn streams_stdout_and_stderr() {
        let (lines, sink) = collector();
        let config = LaunchConfig::new("sh").with_args("-c 'echo out; echo err 1>&2'");
        run_process_until(&config, sink, std::future::pending())
            .await
            .unwrap();
        let mut lines = lines.lock().unwrap().clone();
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
    }

    #[tokio::test]
    async fn failing_exit_is_reported() {
        let (_, sink) = collector();
        let config = LaunchConfig::new("sh").with_args("-c 'exit 3'");
        let err = run_process_until(&config, sink, std::future::pending())
            .await
            .unwrap_err();
        match err {
            ProcessError::Exit { status, .. } => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn interrupt_wins_over_running_child() {
        let (_, sink) = collector();
        let config = LaunchConfig::new("sleep").with_args("3");
        let err = run_process_until(&config, sink, tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(err.is_interrupted());
    }

    #[tokio::test]
    async fn env_overlay_reaches_child() {
        let (lines, sink) = collector();
        let config = LaunchConfig::new("sh")
            .with_args(r#"-c 'echo "$SVCPROC_GREETING"'"#)
            .with_env("SVCPROC_NAME=svc")
            .with_env("SVCPROC_GREETING=hello-$SVCPROC_NAME");
        run_process_until(&config, sink, std::future::pending())
            .await
            .unwrap();
        assert_eq!(*lines.lock().unwrap(), vec!["hello-svc"]);
    }
}
