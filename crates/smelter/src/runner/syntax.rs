//! Static syntax validation
//!
//! Fast-fail check run before any compile time is spent. Each check
//! gets its own scratch workspace, uses the toolchain's syntax-only
//! command (or a full compile to a discarded target), and runs under a
//! short budget independent of the execution timeout.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, instrument};

use crate::config::{CommandContext, LanguageId, Toolchain};
use crate::exec::{self, ScratchWorkspace};
use crate::types::{Limits, OutcomeKind, SyntaxVerdict};

/// Address-space ceiling for checker invocations. Compilers (javac in
/// particular) map large virtual regions, so the check runs laxer than
/// user code.
const CHECK_MEMORY_LIMIT: u64 = 4 * 1024 * 1024 * 1024;

static PYTHON_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"line (\d+)").expect("line pattern is valid"));

/// Validate the source without executing it.
#[instrument(skip(toolchain, source))]
pub async fn check(toolchain: &Toolchain, language: LanguageId, source: &str) -> SyntaxVerdict {
    let workspace = match ScratchWorkspace::create() {
        Ok(workspace) => workspace,
        Err(e) => {
            return SyntaxVerdict::CheckerError {
                message: format!("syntax check failed: {e}"),
            };
        }
    };

    let source_name = toolchain.source_name(source);
    let source_path = match workspace.write_source(&source_name, source) {
        Ok(path) => path,
        Err(e) => {
            return SyntaxVerdict::CheckerError {
                message: format!("syntax check failed: {e}"),
            };
        }
    };

    let dir = workspace.path().display().to_string();
    let source_str = source_path.display().to_string();
    let class = toolchain.entry_class(source);
    let argv = Toolchain::expand_command(
        &toolchain.check.command,
        &CommandContext {
            source: &source_str,
            binary: "",
            class: &class,
            dir: &dir,
        },
    );

    let limits = Limits::none().with_memory_limit(CHECK_MEMORY_LIMIT);
    let budget = Duration::from_secs(toolchain.check.timeout_secs);
    let result = exec::run(&argv, workspace.path(), budget, &limits).await;

    debug!(kind = ?result.kind, return_code = ?result.return_code, "syntax check complete");

    match result.kind {
        OutcomeKind::Success => SyntaxVerdict::Clean,
        OutcomeKind::Timeout => SyntaxVerdict::CheckerError {
            message: "syntax check timed out".to_owned(),
        },
        OutcomeKind::Infrastructure => SyntaxVerdict::CheckerError {
            message: result
                .error
                .unwrap_or_else(|| "syntax check failed".to_owned()),
        },
        _ => {
            let diagnostic = scrub_paths(&result.stderr, &source_str);
            let message = match language {
                LanguageId::Python => format_python_diagnostic(&diagnostic)
                    .unwrap_or_else(|| diagnostic.trim().to_owned()),
                _ => diagnostic.trim().to_owned(),
            };
            SyntaxVerdict::Invalid { message }
        }
    }
}

/// Strip the scratch file path out of compiler diagnostics so messages
/// reference only line/column positions.
fn scrub_paths(diagnostic: &str, source_path: &str) -> String {
    diagnostic
        .replace(&format!("{source_path}:"), "")
        .replace(source_path, "")
}

/// Reduce a Python traceback to `Syntax Error at line N: msg`.
///
/// Best-effort: returns `None` when no line number or error line can be
/// located, in which case the scrubbed raw diagnostic is used.
fn format_python_diagnostic(diagnostic: &str) -> Option<String> {
    let line = PYTHON_LINE_RE
        .captures(diagnostic)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())?;

    let message = diagnostic
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.contains("Error"))?;

    Some(format!("Syntax Error at line {line}: {message}"))
}
