//! Subprocess execution with merged output capture and graceful
//! termination.
//!
//! tokio's default for `kill_on_drop` is SIGKILL; cancellation here
//! instead delivers SIGINT first so a well-behaved child can observe
//! its signal-cancelled context and flush, then escalates to SIGKILL
//! after a fixed grace period.

use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use codemode_types::ExecError;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// How long a child gets between SIGINT and SIGKILL.
pub const SIGKILL_GRACE: Duration = Duration::from_secs(5);

/// What one subprocess run produced.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// stdout and stderr, merged in arrival order.
    pub output: String,
    /// Exit code; `-(signo)` when the child died on a signal.
    pub exit_code: i32,
    /// Whether the run's own deadline — not the parent context — ended it.
    pub timed_out: bool,
}

/// Run `cmd` to completion under `parent` cancellation and an optional
/// deadline, capturing combined output.
pub async fn run_command(
    cmd: &mut Command,
    parent: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<CapturedOutput, ExecError> {
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let program = format!("{:?}", cmd.as_std().get_program());
    let mut child = cmd
        .spawn()
        .map_err(|e| ExecError::Infrastructure(format!("spawning {program}: {e}")))?;

    let sink: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(copy_stream(stdout, Arc::clone(&sink))));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(copy_stream(stderr, Arc::clone(&sink))));
    }

    let pid = child.id();
    let wait = child.wait();
    tokio::pin!(wait);
    let deadline = sleep_opt(timeout);
    tokio::pin!(deadline);

    let mut timed_out = false;
    let mut interrupted = false;
    let mut killed = false;

    let status = loop {
        tokio::select! {
            status = &mut wait => {
                break status
                    .map_err(|e| ExecError::Infrastructure(format!("waiting for {program}: {e}")))?;
            }
            _ = parent.cancelled(), if !interrupted => {
                interrupted = true;
                send_signal(pid, libc::SIGINT);
            }
            _ = &mut deadline, if !interrupted && !timed_out => {
                timed_out = true;
                interrupted = true;
                send_signal(pid, libc::SIGINT);
            }
            _ = tokio::time::sleep(SIGKILL_GRACE), if interrupted && !killed => {
                killed = true;
                send_signal(pid, libc::SIGKILL);
            }
        }
    };

    for reader in readers {
        let _ = reader.await;
    }
    let output = String::from_utf8_lossy(&sink.lock().await).into_owned();
    let exit_code = status
        .code()
        .unwrap_or_else(|| -status.signal().unwrap_or(1));

    tracing::debug!(%exit_code, timed_out, "subprocess finished");
    Ok(CapturedOutput {
        output,
        exit_code,
        timed_out,
    })
}

async fn copy_stream<R: AsyncRead + Unpin>(mut reader: R, sink: Arc<Mutex<Vec<u8>>>) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink.lock().await.extend_from_slice(&buf[..n]),
        }
    }
}

async fn sleep_opt(duration: Option<Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

fn send_signal(pid: Option<u32>, signal: libc::c_int) {
    if let Some(pid) = pid {
        // The child may already have exited; a failed kill is fine.
        unsafe {
            libc::kill(pid as libc::pid_t, signal);
        }
    }
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
    async fn merges_stdout_and_stderr() {
        let parent = CancellationToken::new();
        let captured = run_command(&mut sh("echo out; echo err 1>&2"), &parent, None)
            .await
            .unwrap();
        assert_eq!(captured.exit_code, 0);
        assert!(!captured.timed_out);
        assert!(captured.output.contains("out"));
        assert!(captured.output.contains("err"));
    }

    #[tokio::test]
    async fn reports_exit_code() {
        let parent = CancellationToken::new();
        let captured = run_command(&mut sh("exit 7"), &parent, None).await.unwrap();
        assert_eq!(captured.exit_code, 7);
    }

    #[tokio::test]
    async fn timeout_sends_sigint_and_child_exits_gracefully() {
        let parent = CancellationToken::new();
        let script = "trap 'echo graceful shutdown; exit 0' INT; while true; do sleep 0.05; done";
        let captured = run_command(
            &mut sh(script),
            &parent,
            Some(Duration::from_millis(300)),
        )
        .await
        .unwrap();
        assert!(captured.timed_out);
        assert_eq!(captured.exit_code, 0);
        assert!(captured.output.contains("graceful shutdown"));
    }

    #[tokio::test]
    async fn parent_cancellation_is_not_a_timeout() {
        let parent = CancellationToken::new();
        let cancel = parent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        });
        let script = "trap 'exit 0' INT; while true; do sleep 0.05; done";
        let captured = run_command(&mut sh(script), &parent, Some(Duration::from_secs(30)))
            .await
            .unwrap();
        assert!(!captured.timed_out);
        assert_eq!(captured.exit_code, 0);
    }

    #[tokio::test]
    async fn signal_death_yields_negative_exit_code() {
        let parent = CancellationToken::new();
        let captured = run_command(&mut sh("kill -TERM $$; sleep 5"), &parent, None)
            .await
            .unwrap();
        assert_eq!(captured.exit_code, -libc::SIGTERM);
    }
}
