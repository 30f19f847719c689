//! Streaming wrapper around `tokio::process`.
//!
//! A spawned child is exposed as a channel of output chunks followed by a single
//! [`ProcessEvent::Exited`]. stdout and stderr are drained concurrently so a chatty
//! child never stalls on a full pipe.

use std::io;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;

const CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug)]
pub enum ProcessEvent {
    Stdout(Bytes),
    Stderr(Bytes),
    /// Exit code; `None` when the child was killed by a signal or could not be awaited.
    Exited(Option<i32>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

async fn pump<R, F>(mut reader: R, tx: mpsc::UnboundedSender<ProcessEvent>, wrap: F)
where
    R: AsyncRead + Unpin,
    F: Fn(Bytes) -> ProcessEvent,
{
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => {
                // Receiver gone: keep draining so the child is not blocked on a full pipe.
                let _ = tx.send(wrap(Bytes::copy_from_slice(&buffer[..n])));
            }
            Err(e) => {
                log::debug!("[PROCESS] pipe read failed: {}", e);
                break;
            }
        }
    }
}

/// Spawns `cmd` with piped stdout/stderr and returns its event stream.
///
/// The returned error is the spawn failure itself (binary missing, permission denied);
/// everything after a successful spawn is reported through the channel. The child is
/// not killed if the receiver is dropped.
pub fn spawn_streaming(mut cmd: Command) -> io::Result<mpsc::UnboundedReceiver<ProcessEvent>> {
    cmd.stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(false);

    let mut child = cmd.spawn()?;
    let (tx, rx) = mpsc::unbounded_channel();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let out_task = stdout.map(|s| tokio::spawn(pump(s, tx.clone(), ProcessEvent::Stdout)));
    let err_task = stderr.map(|s| tokio::spawn(pump(s, tx.clone(), ProcessEvent::Stderr)));

    tokio::spawn(async move {
        if let Some(t) = out_task {
            let _ = t.await;
        }
        if let Some(t) = err_task {
            let _ = t.await;
        }
        let code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                log::error!("[PROCESS] failed waiting for child: {}", e);
                None
            }
        };
        let _ = tx.send(ProcessEvent::Exited(code));
    });

    Ok(rx)
}

/// Accumulates the event stream until the child exits.
pub async fn collect(mut events: mpsc::UnboundedReceiver<ProcessEvent>) -> ProcessOutput {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_code = None;

    while let Some(event) = events.recv().await {
        match event {
            ProcessEvent::Stdout(chunk) => stdout.extend_from_slice(&chunk),
            ProcessEvent::Stderr(chunk) => stderr.extend_from_slice(&chunk),
            ProcessEvent::Exited(code) => {
                exit_code = code;
                break;
            }
        }
    }

    ProcessOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    }
}

/// Spawn and wait, collecting both streams.
pub async fn run(cmd: Command) -> io::Result<ProcessOutput> {
    let events = spawn_streaming(cmd)?;
    Ok(collect(events).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn captures_both_streams_and_exit_code() {
        let out = run(sh("printf out; printf err >&2; exit 3")).await.unwrap();
        assert_eq!(out.stdout, "out");
        assert_eq!(out.stderr, "err");
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success());
    }

    #[tokio::test]
    async fn large_output_on_both_pipes_does_not_stall() {
        let script = "i=0; while [ $i -lt 2000 ]; do \
                      echo 0123456789012345678901234567890123456789; \
                      echo 0123456789012345678901234567890123456789 >&2; \
                      i=$((i+1)); done";
        let out = run(sh(script)).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.lines().count(), 2000);
        assert_eq!(out.stderr.lines().count(), 2000);
    }

    #[tokio::test]
    async fn events_end_with_exit() {
        let mut rx = spawn_streaming(sh("echo hi")).unwrap();
        let mut last = None;
        while let Some(ev) = rx.recv().await {
            last = Some(ev);
        }
        assert!(matches!(last, Some(ProcessEvent::Exited(Some(0)))));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let err = run(Command::new("/nonexistent/definitely-not-a-tool"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
