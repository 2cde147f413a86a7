//! Child-process execution primitives
//!
//! This module owns everything that touches a child process for batch
//! execution: scratch workspaces, resource-limit application, spawning
//! with captured output, and toolchain probing.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use crate::exec::limits::{Applied, apply_limits};
pub use crate::exec::process::run;
pub use crate::exec::workspace::ScratchWorkspace;

mod limits;
mod process;
mod workspace;

/// Errors that occur during low-level execution operations
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("empty command arguments")]
    EmptyCommand,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("failed to create scratch workspace: {0}")]
    WorkspaceCreate(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Send SIGKILL to a child's whole process group.
///
/// Children are spawned as their own process-group leaders, so the
/// group id equals the child pid and grandchildren die with it.
#[cfg(unix)]
pub(crate) fn kill_process_group(pid: u32) {
    unsafe {
        libc::killpg(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
pub(crate) fn kill_process_group(_pid: u32) {}

/// Send SIGTERM to a child's whole process group (polite interrupt).
#[cfg(unix)]
pub(crate) fn terminate_process_group(pid: u32) {
    unsafe {
        libc::killpg(pid as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
pub(crate) fn terminate_process_group(_pid: u32) {}

/// Look up a program on the caller's PATH.
///
/// Arguments that already contain a `/` are checked as paths directly.
/// Returns the resolved location, or `None` when the binary is absent —
/// the caller records the language as unavailable for the rest of the
/// process lifetime.
pub fn find_program(name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        let path = Path::new(name);
        return path.exists().then(|| path.to_path_buf());
    }

    let path_var = std::env::var("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}
