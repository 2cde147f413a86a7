//! Source formatting through external formatters
//!
//! Formatting is best-effort: a missing formatter or a formatter
//! failure produces a descriptive record, never an error. Java has no
//! ubiquitous command-line formatter, so it gets a simple brace-indent
//! pass instead.

use std::time::Duration;

use tracing::debug;

use crate::config::LanguageId;
use crate::exec::{self, ScratchWorkspace, find_program};
use crate::runner::Runner;
use crate::types::Limits;

/// Formatter invocation budget.
const FORMAT_TIMEOUT: Duration = Duration::from_secs(10);

/// Formatters (gofmt in particular) map large virtual regions; run
/// them laxer than user code.
const FORMAT_MEMORY_LIMIT: u64 = 4 * 1024 * 1024 * 1024;

fn format_limits() -> Limits {
    Limits::none().with_memory_limit(FORMAT_MEMORY_LIMIT)
}

/// Result of a formatting attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatOutcome {
    /// Formatting succeeded; the reformatted source
    Formatted { source: String },

    /// The formatter is missing or rejected the source
    Failed { message: String },
}

impl FormatOutcome {
    #[must_use]
    pub fn is_formatted(&self) -> bool {
        matches!(self, FormatOutcome::Formatted { .. })
    }
}

impl Runner {
    /// Reformat source text for readability.
    pub async fn format_code(&self, source: &str, language: LanguageId) -> FormatOutcome {
        match language {
            LanguageId::Python => format_with_rewrite("black", &["--quiet"], "py", source).await,
            LanguageId::Go => format_to_stdout("gofmt", &[], "go", source).await,
            LanguageId::C => {
                format_to_stdout("clang-format", &["--style=Google"], "c", source).await
            }
            LanguageId::Cpp => {
                format_to_stdout("clang-format", &["--style=Google"], "cpp", source).await
            }
            LanguageId::Java => FormatOutcome::Formatted {
                source: indent_braces(source),
            },
        }
    }
}

/// Run a formatter that prints the result on stdout.
async fn format_to_stdout(
    program: &str,
    args: &[&str],
    extension: &str,
    source: &str,
) -> FormatOutcome {
    let Some((workspace, argv)) = stage(program, args, extension, source) else {
        return missing(program);
    };

    let result = exec::run(&argv, workspace.path(), FORMAT_TIMEOUT, &format_limits()).await;
    if result.is_success() {
        FormatOutcome::Formatted {
            source: result.stdout,
        }
    } else {
        FormatOutcome::Failed {
            message: format!("{program} failed: {}", result.stderr.trim()),
        }
    }
}

/// Run a formatter that rewrites the file in place, then read it back.
async fn format_with_rewrite(
    program: &str,
    args: &[&str],
    extension: &str,
    source: &str,
) -> FormatOutcome {
    let Some((workspace, argv)) = stage(program, args, extension, source) else {
        return missing(program);
    };

    let result = exec::run(&argv, workspace.path(), FORMAT_TIMEOUT, &format_limits()).await;
    if !result.is_success() {
        return FormatOutcome::Failed {
            message: format!("{program} failed: {}", result.stderr.trim()),
        };
    }

    let path = workspace.path().join(format!("code.{extension}"));
    match std::fs::read_to_string(&path) {
        Ok(formatted) => FormatOutcome::Formatted { source: formatted },
        Err(e) => FormatOutcome::Failed {
            message: format!("failed to read formatted source: {e}"),
        },
    }
}

fn stage(
    program: &str,
    args: &[&str],
    extension: &str,
    source: &str,
) -> Option<(ScratchWorkspace, Vec<String>)> {
    find_program(program)?;

    let workspace = ScratchWorkspace::create().ok()?;
    let name = format!("code.{extension}");
    let path = workspace.write_source(&name, source).ok()?;
    debug!(program, path = %path.display(), "staged source for formatting");

    let mut argv = vec![program.to_owned()];
    argv.extend(args.iter().map(|a| (*a).to_owned()));
    argv.push(path.display().to_string());
    Some((workspace, argv))
}

fn missing(program: &str) -> FormatOutcome {
    FormatOutcome::Failed {
        message: format!("formatter '{program}' not found"),
    }
}

/// Minimal brace-driven re-indentation, four spaces per level.
fn indent_braces(source: &str) -> String {
    let mut out = Vec::new();
    let mut depth: usize = 0;

    for line in source.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            out.push(String::new());
            continue;
        }

        if stripped.starts_with('}') {
            depth = depth.saturating_sub(1);
        }

        out.push(format!("{}{}", "    ".repeat(depth), stripped));

        if stripped.ends_with('{') {
            depth += 1;
        }
    }

    out.join("\n")
}
