//! Interactive session management
//!
//! A long-lived child process exchanging input and output with the user
//! across multiple round trips. Two reader tasks stream stdout and
//! stderr lines into the output queue; a waiter task owns the child,
//! reaps it, and pushes the terminal exit marker after both readers
//! have flushed.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::exec::{ScratchWorkspace, kill_process_group, terminate_process_group};
use crate::runner::multiplex::{self, OutputDrain, OutputQueue};
use crate::types::ExecutionResult;

pub use crate::runner::multiplex::SessionEvent;

/// Errors from interactive session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no process is running")]
    NotRunning,

    #[error("session process already terminated")]
    Terminated,

    #[error("empty command arguments")]
    EmptyCommand,

    #[error("failed to spawn process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("source rejected before execution")]
    Rejected(ExecutionResult),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No live process; submitted lines are commands
    Idle,

    /// Process alive; submitted lines go to its stdin
    Running,

    /// Process exited; readers are flushing buffered output
    Draining,
}

/// What happened to a submitted input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The line was written to the running child's stdin
    Sent,

    /// No process is running; the line is a command for the frontend to
    /// interpret
    Command(String),
}

/// One live child process and its plumbing.
///
/// At most one exists per session; starting a new process tears down
/// the previous one first.
#[derive(Debug)]
struct SessionProcess {
    pid: Option<u32>,
    stdin: Option<ChildStdin>,
    alive: Arc<AtomicBool>,
    kill_tx: mpsc::Sender<()>,
    queue: OutputQueue,
    drain: OutputDrain,
    exit_seen: bool,
    // Keeps the scratch directory alive for the program's lifetime
    _workspace: Option<ScratchWorkspace>,
}

impl SessionProcess {
    fn request_kill(&self) {
        if let Some(pid) = self.pid {
            terminate_process_group(pid);
        }
        let _ = self.kill_tx.try_send(());
    }
}

impl Drop for SessionProcess {
    fn drop(&mut self) {
        if self.alive.load(Ordering::Acquire) {
            debug!("session dropped with live child, terminating");
            if let Some(pid) = self.pid {
                kill_process_group(pid);
            }
            let _ = self.kill_tx.try_send(());
        }
    }
}

/// Manager for a long-lived interactive child process.
///
/// State machine: Idle → (start) → Running → (exit or interrupt) →
/// Draining → (exit marker consumed) → Idle. The mode switch for
/// submitted lines follows the current state automatically.
#[derive(Debug, Default)]
pub struct InteractiveSession {
    current: Option<SessionProcess>,
}

impl InteractiveSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        match &self.current {
            None => SessionState::Idle,
            Some(process) => {
                if process.alive.load(Ordering::Acquire) {
                    SessionState::Running
                } else if process.exit_seen {
                    SessionState::Idle
                } else {
                    SessionState::Draining
                }
            }
        }
    }

    /// Start a new child process for this session.
    ///
    /// Any still-alive previous process is terminated first — at most
    /// one session process exists at a time.
    #[instrument(skip(self, argv, cwd), fields(program = argv.first().map(String::as_str)))]
    pub async fn start(&mut self, argv: &[String], cwd: &Path) -> Result<(), SessionError> {
        self.start_with_workspace(argv, cwd, None).await
    }

    pub(crate) async fn start_with_workspace(
        &mut self,
        argv: &[String],
        cwd: &Path,
        workspace: Option<ScratchWorkspace>,
    ) -> Result<(), SessionError> {
        // Implicit invalidation of the previous process
        if let Some(previous) = self.current.take() {
            previous.request_kill();
        }

        let Some(program) = argv.first() else {
            return Err(SessionError::EmptyCommand);
        };

        let mut command = Command::new(program);
        command
            .args(&argv[1..])
            .current_dir(cwd)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(SessionError::SpawnFailed)?;
        let pid = child.id();
        debug!(?pid, "interactive process started");

        let stdin = child.stdin.take();
        let (queue, drain) = multiplex::channel();
        let alive = Arc::new(AtomicBool::new(true));
        let (kill_tx, mut kill_rx) = mpsc::channel::<()>(1);

        // One reader task per stream: block on lines, enqueue, exit on
        // stream close.
        let stdout_task = child.stdout.take().map(|stream| {
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stream).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    queue.push(SessionEvent::Stdout(line));
                }
            })
        });
        let stderr_task = child.stderr.take().map(|stream| {
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stream).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    queue.push(SessionEvent::Stderr(line));
                }
            })
        });

        // Waiter task: sole owner of the child. Kill requests arrive
        // over the channel, so there is no terminate-after-exit race on
        // the child handle itself.
        let waiter_alive = alive.clone();
        let waiter_queue = queue.clone();
        tokio::spawn(async move {
            let mut kill_closed = false;
            let status = loop {
                // The wait future borrows the child, so the select only
                // reports which branch fired; the kill itself happens
                // after the borrow ends.
                let kill_request = tokio::select! {
                    status = child.wait() => break status,
                    msg = kill_rx.recv(), if !kill_closed => msg,
                };
                match kill_request {
                    Some(()) => {
                        if let Some(pid) = child.id() {
                            kill_process_group(pid);
                        }
                        if let Err(e) = child.start_kill() {
                            warn!(?e, "kill request failed");
                        }
                    }
                    None => kill_closed = true,
                }
            };

            waiter_alive.store(false, Ordering::Release);

            // Let both readers flush remaining buffered output before
            // the terminal marker.
            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            if let Some(task) = stderr_task {
                let _ = task.await;
            }

            let return_code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!(?e, "wait for interactive child failed");
                    None
                }
            };
            debug!(?return_code, "interactive process exited");
            waiter_queue.push(SessionEvent::Exited { return_code });
        });

        self.current = Some(SessionProcess {
            pid,
            stdin,
            alive,
            kill_tx,
            queue,
            drain,
            exit_seen: false,
            _workspace: workspace,
        });

        Ok(())
    }

    /// Submit one input line.
    ///
    /// While a process is running the line (plus a newline) is written
    /// to its stdin immediately; otherwise the line is handed back as a
    /// command. The mode switch is automatic — no toggle to manage.
    pub async fn submit_line(&mut self, line: &str) -> Result<Submission, SessionError> {
        if self.state() != SessionState::Running {
            return Ok(Submission::Command(line.to_owned()));
        }

        let process = self.current.as_mut().ok_or(SessionError::NotRunning)?;
        let stdin = process.stdin.as_mut().ok_or(SessionError::Terminated)?;

        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        debug!(len = line.len(), "wrote line to child stdin");
        Ok(Submission::Sent)
    }

    /// Close the child's stdin to signal EOF.
    pub fn close_stdin(&mut self) {
        if let Some(process) = self.current.as_mut() {
            process.stdin = None;
        }
    }

    /// Drain all currently queued events without blocking.
    ///
    /// Intended for a fixed-interval UI tick. Observing the exit marker
    /// completes the Draining → Idle transition.
    pub fn poll_events(&mut self) -> Vec<SessionEvent> {
        let Some(process) = self.current.as_mut() else {
            return Vec::new();
        };

        let events = process.drain.drain();
        if events
            .iter()
            .any(|e| matches!(e, SessionEvent::Exited { .. }))
        {
            process.exit_seen = true;
            self.current = None;
        }
        events
    }

    /// Wait for the next event. Returns `None` when the session has no
    /// process or the queue is exhausted after exit.
    pub async fn recv_event(&mut self) -> Option<SessionEvent> {
        let process = self.current.as_mut()?;
        let event = process.drain.next().await;
        if matches!(event, Some(SessionEvent::Exited { .. }) | None) {
            process.exit_seen = true;
            self.current = None;
        }
        event
    }

    /// Interrupt the running process: terminate its process tree and
    /// transition to Draining without waiting for natural exit.
    pub fn interrupt(&mut self) -> bool {
        let Some(process) = self.current.as_ref() else {
            return false;
        };
        if !process.alive.load(Ordering::Acquire) {
            return false;
        }

        process.queue.push(SessionEvent::Interrupted);
        process.request_kill();
        true
    }
}
