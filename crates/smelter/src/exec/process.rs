//! Batch process execution with captured output
//!
//! Runs one command to completion under a wall-clock timeout, with CPU
//! and memory ceilings applied pre-exec and both output streams capped
//! at a fixed byte ceiling.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::exec::{apply_limits, kill_process_group};
use crate::types::{ExecutionResult, Limits, OutcomeKind, TRUNCATION_MARKER};

/// Read buffer size for output capture.
const READ_CHUNK: usize = 8 * 1024;

/// Run a command to completion, capturing stdout and stderr.
///
/// Never returns `Err`: spawn failures, timeouts, and signals all
/// surface as a failed [`ExecutionResult`] with a descriptive error.
#[instrument(skip(argv, cwd, limits), fields(program = argv.first().map(String::as_str)))]
pub async fn run(
    argv: &[String],
    cwd: &Path,
    timeout: Duration,
    limits: &Limits,
) -> ExecutionResult {
    let Some(program) = argv.first() else {
        return ExecutionResult::failure(OutcomeKind::Infrastructure, "empty command arguments");
    };

    let mut command = Command::new(program);
    command
        .args(&argv[1..])
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    command.process_group(0);

    apply_limits(&mut command, timeout, limits.memory_limit_bytes());

    debug!(?argv, "spawning process");

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ExecutionResult::failure(
                OutcomeKind::Infrastructure,
                format!("failed to spawn '{program}': {e}"),
            );
        }
    };

    let pid = child.id();
    let cap = limits.max_output_bytes() as usize;

    let stdout_task = child
        .stdout
        .take()
        .map(|stream| tokio::spawn(read_capped(stream, cap)));
    let stderr_task = child
        .stderr
        .take()
        .map(|stream| tokio::spawn(read_capped(stream, cap)));

    let wait_outcome = tokio::time::timeout(timeout, child.wait()).await;

    let status = match wait_outcome {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            warn!(?e, "wait failed");
            return ExecutionResult::failure(
                OutcomeKind::Infrastructure,
                format!("failed to wait for process: {e}"),
            );
        }
        Err(_) => {
            // Wall clock expired: kill the whole process group so
            // grandchildren die too, then reap.
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            let _ = child.kill().await;
            let _ = child.wait().await;
            None
        }
    };

    let (stdout, stdout_truncated) = collect_stream(stdout_task).await;
    let (stderr, stderr_truncated) = collect_stream(stderr_task).await;
    let truncated = stdout_truncated || stderr_truncated;

    let stdout = finalize_stream(stdout, stdout_truncated);
    let stderr = finalize_stream(stderr, stderr_truncated);

    let Some(status) = status else {
        let error = format!("timed out after {timeout:?}");
        debug!(%error, "process timed out");
        return ExecutionResult {
            kind: OutcomeKind::Timeout,
            success: false,
            stdout,
            stderr,
            return_code: Some(-1),
            error: Some(error),
            truncated,
        };
    };

    let return_code = status.code();
    debug!(?return_code, truncated, "process complete");

    if status.success() {
        ExecutionResult::ok(stdout, stderr, truncated)
    } else {
        let error = match return_code {
            Some(code) => format!("process exited with code {code}"),
            None => describe_signal(&status),
        };
        ExecutionResult {
            kind: OutcomeKind::RuntimeFailure,
            success: false,
            stdout,
            stderr,
            return_code,
            error: Some(error),
            truncated,
        }
    }
}

/// Read a stream to EOF, keeping at most `cap` bytes.
///
/// Past the ceiling the stream is still drained so the child never
/// blocks on a full pipe.
async fn read_capped<R>(mut stream: R, cap: usize) -> (Vec<u8>, bool)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; READ_CHUNK];

    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if collected.len() < cap {
                    let take = n.min(cap - collected.len());
                    collected.extend_from_slice(&buf[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }

    (collected, truncated)
}

async fn collect_stream(
    task: Option<tokio::task::JoinHandle<(Vec<u8>, bool)>>,
) -> (Vec<u8>, bool) {
    match task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => (Vec::new(), false),
    }
}

fn finalize_stream(bytes: Vec<u8>, truncated: bool) -> String {
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if truncated {
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(TRUNCATION_MARKER);
    }
    text
}

#[cfg(unix)]
fn describe_signal(status: &std::process::ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(sig) => format!("process terminated by signal {sig}"),
        None => "process terminated abnormally".to_owned(),
    }
}

#[cfg(not(unix))]
fn describe_signal(_status: &std::process::ExitStatus) -> String {
    "process terminated abnormally".to_owned()
}
