//! Bounded-time subprocess execution with capped stream capture.
//!
//! The runner spawns the external compiler, drains stdout/stderr
//! incrementally while the process runs (a compiler blocked on a full
//! pipe buffer would otherwise deadlock the whole request), and races
//! the exit against a deadline. On expiry the process is killed
//! unconditionally; the compiler is assumed non-cooperative on timeout.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use crate::errors::CompileError;

/// Result of one subprocess invocation. Immutable once produced.
///
/// A non-zero exit code is data here, not an error: the pass sequencer
/// decides what it means.
#[derive(Debug)]
pub struct InvocationOutcome {
    /// Exit code, or `None` when the process was forcibly terminated.
    pub exit_code: Option<i32>,
    /// Captured standard output (capped).
    pub stdout: String,
    /// Captured standard error (capped).
    pub stderr: String,
    /// Whether the deadline fired before the process exited.
    pub timed_out: bool,
}

impl InvocationOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Accumulates stream bytes up to a fixed cap; excess is discarded.
struct CappedBuffer {
    buf: Vec<u8>,
    cap: usize,
    truncated: bool,
}

impl CappedBuffer {
    fn new(cap: usize) -> Self {
        Self {
            buf: Vec::new(),
            cap,
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.cap.saturating_sub(self.buf.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    fn into_string(self) -> String {
        let mut text = String::from_utf8_lossy(&self.buf).into_owned();
        if self.truncated {
            text.push_str("\n[output truncated]");
        }
        text
    }
}

/// Read a stream to EOF into a capped buffer.
///
/// Runs concurrently with the process; keeps the pipe drained even when
/// the cap has been reached so the child never blocks on a full buffer.
async fn drain_stream<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> String {
    let mut acc = CappedBuffer::new(cap);
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => acc.push(&chunk[..n]),
            Err(_) => break,
        }
    }
    acc.into_string()
}

/// Spawns external processes with a deadline and captured streams.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    capture_cap: usize,
}

impl ProcessRunner {
    pub fn new(capture_cap: usize) -> Self {
        Self { capture_cap }
    }

    /// Run `command args..` in `working_dir`, waiting at most `deadline`.
    ///
    /// Spawn failure (binary missing, permission denied) is the only
    /// error path; everything after a successful spawn — including a
    /// timeout kill — is reported inside the outcome.
    pub async fn run(
        &self,
        command: &str,
        args: &[impl AsRef<OsStr>],
        working_dir: &Path,
        deadline: Duration,
    ) -> Result<InvocationOutcome, CompileError> {
        let mut child = Command::new(command)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(CompileError::Spawn)?;

        // Drain both pipes concurrently with the wait below.
        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(drain_stream(out, self.capture_cap)));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(drain_stream(err, self.capture_cap)));

        // Race process exit against the deadline. Whichever side wins
        // cancels the other: a normal exit drops the timer, an expired
        // timer kills and reaps the child.
        let (exit_code, timed_out) = match tokio::time::timeout(deadline, child.wait()).await {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(err)) => {
                return Err(CompileError::Io {
                    what: "wait for compiler process",
                    source: err,
                });
            }
            Err(_) => {
                // No graceful-shutdown grace period: kill() sends SIGKILL
                // and reaps, so no orphan survives the call.
                if let Err(err) = child.kill().await {
                    debug!(error = %err, "kill after deadline failed");
                }
                (None, true)
            }
        };

        // The pipes hit EOF once the process is gone, so these complete
        // promptly on both the exit and the kill path.
        let stdout = match stdout_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        debug!(
            command,
            exit_code = ?exit_code,
            timed_out,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "compiler invocation finished"
        );

        Ok(InvocationOutcome {
            exit_code,
            stdout,
            stderr,
            timed_out,
        })
    }
}
