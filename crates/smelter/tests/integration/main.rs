//! Integration tests for smelter
//!
//! These tests exercise real toolchains. Each test probes availability
//! at runtime and skips (with a note on stderr) when the language's
//! compiler or interpreter is not installed, so the suite passes on
//! hosts with any subset of the five toolchains.

use std::sync::{Mutex, MutexGuard, PoisonError};

use smelter::{LanguageId, Runner};

mod execution;
mod interactive_execution;
mod syntax_checking;
mod workspace_lifecycle;

static SERIAL: Mutex<()> = Mutex::new(());

/// Serialize tests that create scratch directories so the
/// directory-count assertions cannot race each other.
pub(crate) fn serial_guard() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared runner with the embedded default configuration.
pub(crate) fn runner() -> Runner {
    Runner::with_defaults()
}

/// Check toolchain availability, noting a skip when absent.
pub(crate) fn available(runner: &Runner, language: LanguageId) -> bool {
    if runner.is_available(language) {
        true
    } else {
        eprintln!("skipping: toolchain for {language} not installed");
        false
    }
}

/// Count smelter scratch directories currently present under the temp
/// root. Used to assert workspace cleanup and denylist short-circuits.
pub(crate) fn scratch_dir_count() -> usize {
    std::fs::read_dir(std::env::temp_dir())
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| {
                    e.file_name()
                        .to_string_lossy()
                        .starts_with("smelter-exec-")
                })
                .count()
        })
        .unwrap_or(0)
}
