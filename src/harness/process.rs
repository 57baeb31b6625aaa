//! Time-bounded child process execution.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured output of a finished child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn stdout_lossy(&self) -> String {
        decode_lossy(&self.stdout)
    }

    pub fn stderr_lossy(&self) -> String {
        decode_lossy(&self.stderr)
    }
}

/// Outcome of a bounded run.
#[derive(Debug)]
pub enum Completion {
    Exited(ProcessOutput),
    /// The child was killed after exceeding its bound.
    TimedOut,
}

/// Spawn `cmd` with piped output and wait at most `timeout` for it.
///
/// Output is drained on reader threads so a chatty child cannot block on
/// a full pipe. A child that exceeds the bound is killed and reaped.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> std::io::Result<Completion> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout_handle = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = out.read_to_end(&mut buf);
            buf
        })
    });
    let stderr_handle = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = err.read_to_end(&mut buf);
            buf
        })
    });

    let start = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break Some(status),
            None if start.elapsed() >= timeout => break None,
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let Some(status) = status else {
        let _ = child.kill();
        let _ = child.wait();
        // Grandchildren may still hold the pipes open, so the readers are
        // left detached instead of joined.
        return Ok(Completion::TimedOut);
    };

    let stdout = stdout_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    Ok(Completion::Exited(ProcessOutput {
        status,
        stdout,
        stderr,
    }))
}

/// Decode bytes as UTF-8, dropping anything undecodable.
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\u{FFFD}', "")
}
