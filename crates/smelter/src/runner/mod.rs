//! Sandboxed execution pipeline
//!
//! Orchestrates one execution: availability check, dangerous-pattern
//! screen, syntax validation, scratch workspace, optional compile
//! phase, run phase, teardown. Every public operation is total — it
//! returns a result record describing failure rather than raising past
//! this boundary.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

pub use crate::runner::interactive::{
    InteractiveSession, SessionError, SessionEvent, SessionState, Submission,
};
pub use crate::runner::screen::Denylist;

pub(crate) mod multiplex;

mod fmt;
mod interactive;
mod screen;
mod syntax;

use crate::config::{CommandContext, Config, LanguageId, Toolchain};
use crate::exec::{self, ScratchWorkspace, find_program};
use crate::types::{
    ExecutionRequest, ExecutionResult, Limits, OutcomeKind, SyntaxVerdict, ValidationReport,
};

pub use crate::runner::fmt::FormatOutcome;

/// Artifact name for compiled executables inside the scratch directory.
const DEFAULT_OUTPUT_NAME: &str = "main";

/// Address-space ceiling for compile phases. Compilers routinely map
/// more virtual memory than executed user code is allowed.
const COMPILE_MEMORY_LIMIT: u64 = 4 * 1024 * 1024 * 1024;

/// Availability and invocation details for one language.
#[derive(Debug, Clone)]
pub struct LanguageInfo {
    pub language: LanguageId,
    pub name: String,
    pub available: bool,
    pub compiled: bool,
    pub extension: String,
    /// Resolved path of the probed compiler/interpreter, if found
    pub binary: Option<PathBuf>,
}

/// Snapshot of the runner's environment.
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub available_languages: Vec<LanguageId>,
    pub default_limits: Limits,
    pub default_timeout: Duration,
    pub temp_root: PathBuf,
}

/// High-level runner for sandboxed code execution.
///
/// Toolchain availability is probed exactly once at construction; a
/// language whose binary is missing stays unsupported for the life of
/// the runner.
#[derive(Debug)]
pub struct Runner {
    config: Config,
    available: HashMap<LanguageId, PathBuf>,
    denylists: HashMap<LanguageId, Denylist>,
}

impl Runner {
    /// Create a new runner, probing each configured toolchain.
    pub fn new(config: Config) -> Self {
        let mut available = HashMap::new();
        let mut denylists = HashMap::new();

        for (&id, toolchain) in &config.languages {
            match toolchain.probe_binary().and_then(find_program) {
                Some(path) => {
                    debug!(language = %id, binary = %path.display(), "toolchain available");
                    available.insert(id, path);
                }
                None => {
                    debug!(language = %id, "toolchain unavailable");
                }
            }

            // Patterns were validated at config load; a failure here
            // would be a config bypass, so fall back to an open screen
            // rather than refusing to construct.
            let denylist = match Denylist::compile(&toolchain.denylist) {
                Ok(denylist) => denylist,
                Err(e) => {
                    warn!(language = %id, ?e, "denylist compilation failed");
                    Denylist::empty()
                }
            };
            denylists.insert(id, denylist);
        }

        info!(
            available = available.len(),
            configured = config.languages.len(),
            "toolchains probed"
        );

        Self {
            config,
            available,
            denylists,
        }
    }

    /// Create a runner with the embedded default configuration.
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// The configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check whether a language's toolchain was found at probe time.
    pub fn is_available(&self, language: LanguageId) -> bool {
        self.available.contains_key(&language)
    }

    /// All languages whose toolchains are present, in display order.
    pub fn available_languages(&self) -> Vec<LanguageId> {
        LanguageId::ALL
            .into_iter()
            .filter(|lang| self.available.contains_key(lang))
            .collect()
    }

    /// Availability and invocation details for one language.
    pub fn language_info(&self, language: LanguageId) -> LanguageInfo {
        let toolchain = self.config.languages.get(&language);
        LanguageInfo {
            language,
            name: toolchain.map(|t| t.name.clone()).unwrap_or_default(),
            available: self.is_available(language),
            compiled: toolchain.map(Toolchain::is_compiled).unwrap_or(false),
            extension: toolchain
                .map(|t| t.extension.to_string())
                .unwrap_or_default(),
            binary: self.available.get(&language).cloned(),
        }
    }

    /// Snapshot of the execution environment.
    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            available_languages: self.available_languages(),
            default_limits: self.config.default_limits.clone(),
            default_timeout: self.config.default_timeout(),
            temp_root: std::env::temp_dir(),
        }
    }

    /// Validate the source's syntax without executing it.
    pub async fn check_syntax(&self, source: &str, language: LanguageId) -> SyntaxVerdict {
        let Ok(toolchain) = self.config.toolchain(language) else {
            return SyntaxVerdict::CheckerError {
                message: format!("language '{language}' is not configured"),
            };
        };
        if !self.is_available(language) {
            return SyntaxVerdict::CheckerError {
                message: format!("language '{language}' is not supported or compiler not available"),
            };
        }

        syntax::check(toolchain, language, source).await
    }

    /// Execute source text through the full pipeline.
    ///
    /// Short-circuits on the first failure: unsupported language,
    /// denylist hit, syntax error, compile error. The scratch workspace
    /// is destroyed on every path.
    #[instrument(skip(self, request), fields(language = %request.language))]
    pub async fn run_code(&self, request: &ExecutionRequest) -> ExecutionResult {
        let language = request.language;

        let Ok(toolchain) = self.config.toolchain(language) else {
            return ExecutionResult::failure(
                OutcomeKind::UnsupportedLanguage,
                format!("language '{language}' is not configured"),
            );
        };
        if !self.is_available(language) {
            return ExecutionResult::failure(
                OutcomeKind::UnsupportedLanguage,
                format!("language '{language}' is not supported or compiler not available"),
            );
        }

        // Heuristic screen before any workspace exists
        if let Some(denylist) = self.denylists.get(&language)
            && let Some(pattern) = denylist.screen(&request.source)
        {
            debug!(pattern, "source rejected by denylist");
            return ExecutionResult::failure(
                OutcomeKind::Denied,
                "code contains potentially dangerous operations",
            );
        }

        match syntax::check(toolchain, language, &request.source).await {
            SyntaxVerdict::Clean => {}
            SyntaxVerdict::Invalid { message } => {
                return ExecutionResult::failure(
                    OutcomeKind::SyntaxError,
                    format!("Syntax Error: {message}"),
                );
            }
            SyntaxVerdict::CheckerError { message } => {
                return ExecutionResult::failure(OutcomeKind::Infrastructure, message);
            }
        }

        self.execute_prepared(toolchain, request).await
    }

    /// Validate syntax and execute, reporting both stages.
    pub async fn validate_and_execute(&self, request: &ExecutionRequest) -> ValidationReport {
        match self.check_syntax(&request.source, request.language).await {
            SyntaxVerdict::Invalid { message } => {
                return ValidationReport {
                    syntax_valid: false,
                    syntax_error: Some(message.clone()),
                    execution_attempted: false,
                    result: ExecutionResult::failure(
                        OutcomeKind::SyntaxError,
                        format!("Syntax Error: {message}"),
                    ),
                };
            }
            SyntaxVerdict::CheckerError { message } => {
                return ValidationReport {
                    syntax_valid: false,
                    syntax_error: Some(message.clone()),
                    execution_attempted: false,
                    result: ExecutionResult::failure(OutcomeKind::Infrastructure, message),
                };
            }
            SyntaxVerdict::Clean => {}
        }

        // run_code re-checks syntax; the duplicate check keeps run_code
        // safe to call on its own while this path reports both stages.
        let result = self.run_code(request).await;
        ValidationReport {
            syntax_valid: true,
            syntax_error: None,
            execution_attempted: true,
            result,
        }
    }

    /// Compile (if needed) and start the program as an interactive
    /// session instead of a batch run.
    ///
    /// The same pre-flight pipeline applies; rejections surface as
    /// [`SessionError::Rejected`] carrying the failure record.
    pub async fn run_interactive(
        &self,
        source: &str,
        language: LanguageId,
        timeout: Duration,
    ) -> Result<InteractiveSession, SessionError> {
        let Ok(toolchain) = self.config.toolchain(language) else {
            return Err(SessionError::Rejected(ExecutionResult::failure(
                OutcomeKind::UnsupportedLanguage,
                format!("language '{language}' is not configured"),
            )));
        };
        if !self.is_available(language) {
            return Err(SessionError::Rejected(ExecutionResult::failure(
                OutcomeKind::UnsupportedLanguage,
                format!("language '{language}' is not supported or compiler not available"),
            )));
        }

        if let Some(denylist) = self.denylists.get(&language)
            && denylist.screen(source).is_some()
        {
            return Err(SessionError::Rejected(ExecutionResult::failure(
                OutcomeKind::Denied,
                "code contains potentially dangerous operations",
            )));
        }

        match syntax::check(toolchain, language, source).await {
            SyntaxVerdict::Clean => {}
            SyntaxVerdict::Invalid { message } => {
                return Err(SessionError::Rejected(ExecutionResult::failure(
                    OutcomeKind::SyntaxError,
                    format!("Syntax Error: {message}"),
                )));
            }
            SyntaxVerdict::CheckerError { message } => {
                return Err(SessionError::Rejected(ExecutionResult::failure(
                    OutcomeKind::Infrastructure,
                    message,
                )));
            }
        }

        let workspace = match ScratchWorkspace::create() {
            Ok(workspace) => workspace,
            Err(e) => {
                return Err(SessionError::Rejected(ExecutionResult::failure(
                    OutcomeKind::Infrastructure,
                    e.to_string(),
                )));
            }
        };

        let paths = match StagedSource::write(&workspace, toolchain, source) {
            Ok(paths) => paths,
            Err(e) => {
                return Err(SessionError::Rejected(ExecutionResult::failure(
                    OutcomeKind::Infrastructure,
                    e.to_string(),
                )));
            }
        };

        if toolchain.is_compiled() {
            let compile_result = self
                .compile_phase(toolchain, &paths, &workspace, timeout)
                .await;
            if !compile_result.is_success() {
                return Err(SessionError::Rejected(compile_result));
            }
        }

        let run_argv = Toolchain::expand_command(&toolchain.run.command, &paths.context());
        let mut session = InteractiveSession::new();
        session
            .start_with_workspace(&run_argv, paths.dir_path(), Some(workspace))
            .await?;
        Ok(session)
    }

    /// Run the compile + run phases against an already-screened source.
    async fn execute_prepared(
        &self,
        toolchain: &Toolchain,
        request: &ExecutionRequest,
    ) -> ExecutionResult {
        let workspace = match ScratchWorkspace::create() {
            Ok(workspace) => workspace,
            Err(e) => {
                return ExecutionResult::failure(OutcomeKind::Infrastructure, e.to_string());
            }
        };

        let paths = match StagedSource::write(&workspace, toolchain, &request.source) {
            Ok(paths) => paths,
            Err(e) => {
                return ExecutionResult::failure(OutcomeKind::Infrastructure, e.to_string());
            }
        };

        if toolchain.is_compiled() {
            let compile_result = self
                .compile_phase(toolchain, &paths, &workspace, request.timeout)
                .await;
            if !compile_result.is_success() {
                return compile_result;
            }
        }

        let run_argv = Toolchain::expand_command(&toolchain.run.command, &paths.context());
        let limits = self
            .config
            .effective_limits(toolchain.run.limits.as_ref());
        exec::run(&run_argv, workspace.path(), request.timeout, &limits).await
        // workspace dropped here: scratch directory removed on every path
    }

    /// Compile phase: half the total timeout budget, compiler-friendly
    /// memory ceiling, failures reported with the compiler's stderr.
    async fn compile_phase(
        &self,
        toolchain: &Toolchain,
        paths: &StagedSource,
        workspace: &ScratchWorkspace,
        timeout: Duration,
    ) -> ExecutionResult {
        let Some(compile) = toolchain.compile.as_ref() else {
            return ExecutionResult::ok(String::new(), String::new(), false);
        };

        let argv = Toolchain::expand_command(&compile.command, &paths.context());
        let base = Limits {
            memory_limit: Some(COMPILE_MEMORY_LIMIT),
            max_output: self.config.default_limits.max_output,
        };
        let limits = match compile.limits.as_ref() {
            Some(overrides) => base.with_overrides(overrides),
            None => base,
        };
        let budget = (timeout / 2).max(Duration::from_secs(1));

        let result = exec::run(&argv, workspace.path(), budget, &limits).await;
        if result.is_success() {
            return result;
        }

        debug!(return_code = ?result.return_code, "compile phase failed");
        match result.kind {
            // Keep timeout and infrastructure categories distinct from
            // an ordinary compiler rejection
            OutcomeKind::Timeout | OutcomeKind::Infrastructure => result,
            _ => ExecutionResult {
                kind: OutcomeKind::CompileError,
                error: Some("compilation failed".to_owned()),
                ..result
            },
        }
    }
}

/// Concrete file names for one staged execution.
struct StagedSource {
    source: String,
    binary: String,
    class: String,
    dir: String,
}

impl StagedSource {
    fn write(
        workspace: &ScratchWorkspace,
        toolchain: &Toolchain,
        source_text: &str,
    ) -> Result<Self, exec::ExecError> {
        let source_name = toolchain.source_name(source_text);
        let source_path = workspace.write_source(&source_name, source_text)?;

        let output_name = toolchain
            .compile
            .as_ref()
            .map(|c| c.output_name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_OUTPUT_NAME);
        let binary_path = workspace.file_path(output_name)?;

        Ok(Self {
            source: source_path.display().to_string(),
            binary: binary_path.display().to_string(),
            class: toolchain.entry_class(source_text),
            dir: workspace.path().display().to_string(),
        })
    }

    fn context(&self) -> CommandContext<'_> {
        CommandContext {
            source: &self.source,
            binary: &self.binary,
            class: &self.class,
            dir: &self.dir,
        }
    }

    fn dir_path(&self) -> &std::path::Path {
        std::path::Path::new(&self.dir)
    }
}
