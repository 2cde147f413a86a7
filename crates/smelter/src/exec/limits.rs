//! Resource-limit application for child processes
//!
//! CPU and address-space ceilings are applied between fork and exec so
//! the limits are in place before any user code runs. Platforms without
//! rlimit support get an explicit no-op, reported as such rather than
//! silently pretending the limits are enforced.

use std::time::Duration;

use tokio::process::Command;

/// Whether resource limits were actually installed on the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// rlimits installed via a pre-exec hook
    Enforced,

    /// This platform has no rlimit support; only the wall-clock timeout
    /// constrains the child
    Unsupported,
}

/// Arrange for CPU-time and address-space limits on the command's child.
///
/// The CPU budget mirrors the wall-clock timeout (rounded up to whole
/// seconds); the memory ceiling is the configured address-space limit.
#[cfg(unix)]
pub fn apply_limits(command: &mut Command, timeout: Duration, memory_bytes: u64) -> Applied {
    let cpu_secs = timeout.as_secs().max(1) + u64::from(timeout.subsec_nanos() > 0);

    // Safety: only async-signal-safe calls between fork and exec.
    unsafe {
        command.pre_exec(move || {
            let cpu = libc::rlimit {
                rlim_cur: cpu_secs as libc::rlim_t,
                rlim_max: cpu_secs as libc::rlim_t,
            };
            if libc::setrlimit(libc::RLIMIT_CPU, &cpu) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            let address_space = libc::rlimit {
                rlim_cur: memory_bytes as libc::rlim_t,
                rlim_max: memory_bytes as libc::rlim_t,
            };
            if libc::setrlimit(libc::RLIMIT_AS, &address_space) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            Ok(())
        });
    }

    Applied::Enforced
}

/// No-op fallback: without rlimits the wall-clock timeout is the only
/// enforcement this runner provides.
#[cfg(not(unix))]
pub fn apply_limits(_command: &mut Command, _timeout: Duration, _memory_bytes: u64) -> Applied {
    Applied::Unsupported
}
