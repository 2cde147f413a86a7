//! A library for sandboxed multi-language code execution.
//!
//! Smelter runs user-authored source text through a validate → compile
//! → execute pipeline across five toolchains, and manages long-lived
//! interactive child processes for programs that read standard input.
//!
//! # Features
//!
//! - **Batch execution** — syntax check, optional compile phase, run
//!   phase, all inside a disposable scratch directory.
//! - **Multi-language** — Python, Go, Java, C, and C++ via TOML-driven
//!   toolchain descriptors; availability probed once at startup.
//! - **Resource limits** — wall-clock timeout, CPU and address-space
//!   rlimits (POSIX), per-stream captured-output ceilings.
//! - **Dangerous-pattern screen** — a per-language regex denylist
//!   applied before execution. A heuristic, not an isolation boundary.
//! - **Interactive sessions** — line-based stdin/stdout/stderr exchange
//!   with a running program through a multiplexed event queue.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, LanguageId, Toolchain};
pub use exec::{Applied, ScratchWorkspace};
pub use extract::{CodeBlock, extract_code_blocks};
pub use runner::{
    Denylist, FormatOutcome, InteractiveSession, LanguageInfo, Runner, SessionError, SessionEvent,
    SessionState, Submission, SystemInfo,
};
pub use types::{
    ExecutionRequest, ExecutionResult, Limits, OutcomeKind, SyntaxVerdict, ValidationReport,
};

pub mod config;
pub mod exec;
pub mod extract;
pub mod runner;
pub mod types;
