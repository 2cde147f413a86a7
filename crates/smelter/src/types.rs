use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default wall-clock timeout for one execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured-output ceiling per stream, in bytes.
pub const DEFAULT_MAX_OUTPUT: u64 = 1024 * 1024;

/// Address-space ceiling for executed code, in bytes (POSIX only).
pub const DEFAULT_MEMORY_LIMIT: u64 = 256 * 1024 * 1024;

/// Marker appended to a stream that exceeded the capture ceiling.
pub const TRUNCATION_MARKER: &str = "[output truncated - too long]";

/// Resource ceilings applied to one child process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Address-space limit in bytes (POSIX rlimit; no-op elsewhere)
    #[serde(default)]
    pub memory_limit: Option<u64>,

    /// Maximum captured bytes per output stream
    #[serde(default)]
    pub max_output: Option<u64>,
}

impl Limits {
    /// 1 kibibyte in bytes
    pub const KB: u64 = 1024;
    /// 1 mebibyte in bytes
    pub const MB: u64 = 1024 * 1024;

    /// Create new limits with all fields unset
    pub fn none() -> Self {
        Self {
            memory_limit: None,
            max_output: None,
        }
    }

    /// Set the address-space limit in bytes
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Set the captured-output ceiling in bytes
    pub fn with_max_output(mut self, bytes: u64) -> Self {
        self.max_output = Some(bytes);
        self
    }

    /// Apply overrides from another Limits, preferring values from `overrides`
    pub fn with_overrides(&self, overrides: &Limits) -> Limits {
        Limits {
            memory_limit: overrides.memory_limit.or(self.memory_limit),
            max_output: overrides.max_output.or(self.max_output),
        }
    }

    /// Effective address-space limit, falling back to the default ceiling
    pub fn memory_limit_bytes(&self) -> u64 {
        self.memory_limit.unwrap_or(DEFAULT_MEMORY_LIMIT)
    }

    /// Effective per-stream capture ceiling, falling back to the default
    pub fn max_output_bytes(&self) -> u64 {
        self.max_output.unwrap_or(DEFAULT_MAX_OUTPUT)
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            memory_limit: Some(DEFAULT_MEMORY_LIMIT),
            max_output: Some(DEFAULT_MAX_OUTPUT),
        }
    }
}

/// Category of an execution outcome.
///
/// Lets a frontend style each failure class distinctly without parsing
/// message text or exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Program ran and exited with code 0
    Success,

    /// Language missing from the toolchain availability map
    UnsupportedLanguage,

    /// Source matched a dangerous-pattern denylist rule
    Denied,

    /// Static syntax validation failed
    SyntaxError,

    /// Compile phase exited non-zero
    CompileError,

    /// Run phase exited non-zero or was killed by a signal
    RuntimeFailure,

    /// Wall-clock limit exceeded at compile or run phase
    Timeout,

    /// Spawn failure, workspace fault, or other internal error
    Infrastructure,
}

impl OutcomeKind {
    /// Check whether this kind represents a failure
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !matches!(self, OutcomeKind::Success)
    }
}

/// Result of one execution. Produced exactly once per request and
/// returned by value; never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Outcome category
    pub kind: OutcomeKind,

    /// Whether the program ran to completion with exit code 0
    pub success: bool,

    /// Captured standard output (size-capped)
    pub stdout: String,

    /// Captured standard error (size-capped)
    pub stderr: String,

    /// Exit code if the program exited; -1 for timeouts
    pub return_code: Option<i32>,

    /// Human-readable failure description
    pub error: Option<String>,

    /// Whether either stream hit the capture ceiling
    pub truncated: bool,
}

impl ExecutionResult {
    /// A successful result with captured output
    pub fn ok(stdout: String, stderr: String, truncated: bool) -> Self {
        Self {
            kind: OutcomeKind::Success,
            success: true,
            stdout,
            stderr,
            return_code: Some(0),
            error: None,
            truncated,
        }
    }

    /// A failure with no captured output
    pub fn failure(kind: OutcomeKind, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            kind,
            success: false,
            stdout: String::new(),
            stderr: error.clone(),
            return_code: Some(-1),
            error: Some(error),
            truncated: false,
        }
    }

    /// Check if the execution was successful (exited with code 0)
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success && self.return_code == Some(0)
    }
}

/// One request to validate and execute a piece of source text.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Source text to run
    pub source: String,

    /// Target language tag
    pub language: crate::config::LanguageId,

    /// Wall-clock budget for the whole compile+run pipeline
    pub timeout: Duration,
}

impl ExecutionRequest {
    pub fn new(source: impl Into<String>, language: crate::config::LanguageId) -> Self {
        Self {
            source: source.into(),
            language,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Verdict from the static syntax checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxVerdict {
    /// No syntax problems found
    Clean,

    /// The source failed to parse; message carries line/diagnostic text
    Invalid { message: String },

    /// The checker itself failed (timed out, missing tool). Not a
    /// statement about the source.
    CheckerError { message: String },
}

impl SyntaxVerdict {
    /// Check whether the source may proceed to execution
    #[must_use]
    pub fn is_clean(&self) -> bool {
        matches!(self, SyntaxVerdict::Clean)
    }

    /// The diagnostic text, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            SyntaxVerdict::Clean => None,
            SyntaxVerdict::Invalid { message } | SyntaxVerdict::CheckerError { message } => {
                Some(message)
            }
        }
    }
}

/// Comprehensive record from `validate_and_execute`.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Whether the syntax check passed
    pub syntax_valid: bool,

    /// The syntax diagnostic when validation failed
    pub syntax_error: Option<String>,

    /// Whether the pipeline reached the execution phase
    pub execution_attempted: bool,

    /// The execution (or synthesized failure) result
    pub result: ExecutionResult,
}

impl ValidationReport {
    /// Check if validation and execution both succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.syntax_valid && self.result.is_success()
    }
}
