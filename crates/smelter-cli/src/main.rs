//! Smelter CLI
//!
//! A command-line workbench for validating, executing, and interacting
//! with code across the supported toolchains.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smelter::{
    Config, EXAMPLE_CONFIG, ExecutionRequest, LanguageId, OutcomeKind, Runner, SessionError,
    SessionEvent, SessionState, Submission, SyntaxVerdict,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smelter")]
#[command(about = "A workbench for sandboxed multi-language code execution")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: smelter.toml)
        #[arg(short, long, default_value = "smelter.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Syntax-check a source file without running it
    Check {
        /// Source file to check
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language tag (python, go, java, c, cpp)
        #[arg(short, long)]
        language: LanguageArg,
    },

    /// Validate and execute a source file
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language tag (python, go, java, c, cpp)
        #[arg(short, long)]
        language: LanguageArg,

        /// Wall-clock timeout in seconds for the whole pipeline
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Run a source file as an interactive session, forwarding stdin
    Repl {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language tag (python, go, java, c, cpp)
        #[arg(short, long)]
        language: LanguageArg,

        /// Wall-clock timeout in seconds for the compile phase
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Reformat a source file in place
    Fmt {
        /// Source file to format
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language tag (python, go, java, c, cpp)
        #[arg(short, long)]
        language: LanguageArg,
    },

    /// List configured languages and their availability
    Languages,

    /// Show the effective configuration
    ShowConfig,
}

/// Thin clap wrapper so `-l c++` and friends parse via FromStr.
#[derive(Clone)]
struct LanguageArg(LanguageId);

impl std::str::FromStr for LanguageArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<LanguageId>()
            .map(LanguageArg)
            .map_err(|_| format!("unsupported language '{s}' (expected python, go, java, c, cpp)"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Check { source, language } => run_check(config, &source, language.0).await,
        Commands::Run {
            source,
            language,
            timeout,
        } => run_execute(config, &source, language.0, timeout).await,
        Commands::Repl {
            source,
            language,
            timeout,
        } => run_repl(config, &source, language.0, timeout).await,
        Commands::Fmt { source, language } => run_fmt(config, &source, language.0).await,
        Commands::Languages => {
            list_languages(config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(config);
            Ok(())
        }
    }
}

async fn run_check(config: Config, source: &PathBuf, language: LanguageId) -> Result<()> {
    let source_text = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let runner = Runner::new(config);
    match runner.check_syntax(&source_text, language).await {
        SyntaxVerdict::Clean => {
            println!("Syntax OK");
            Ok(())
        }
        SyntaxVerdict::Invalid { message } => {
            eprintln!("Syntax error:\n{message}");
            std::process::exit(1);
        }
        SyntaxVerdict::CheckerError { message } => {
            eprintln!("Syntax check failed: {message}");
            std::process::exit(2);
        }
    }
}

async fn run_execute(
    config: Config,
    source: &PathBuf,
    language: LanguageId,
    timeout: Option<u64>,
) -> Result<()> {
    let source_text = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let runner = Runner::new(config);
    let mut request = ExecutionRequest::new(source_text, language);
    request.timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| runner.config().default_timeout());

    info!(language = %language, "running program");
    let report = runner.validate_and_execute(&request).await;
    let result = &report.result;

    if !result.stdout.is_empty() {
        println!("{}", result.stdout);
    }
    if !result.stderr.is_empty() && result.kind != OutcomeKind::SyntaxError {
        eprintln!("{}", result.stderr);
    }

    // Distinct header per failure category so causes are tellable
    // apart without reading exit codes
    match result.kind {
        OutcomeKind::Success => {
            if result.stdout.is_empty() {
                println!("Program ran successfully (no output)");
            }
        }
        OutcomeKind::UnsupportedLanguage => eprintln!("Unsupported language: {}", describe(result)),
        OutcomeKind::Denied => eprintln!("Security check failed: {}", describe(result)),
        OutcomeKind::SyntaxError => eprintln!(
            "Syntax error:\n{}",
            report.syntax_error.as_deref().unwrap_or("unknown")
        ),
        OutcomeKind::CompileError => eprintln!("Compilation failed"),
        OutcomeKind::RuntimeFailure => eprintln!("Execution failed: {}", describe(result)),
        OutcomeKind::Timeout => eprintln!("Timed out: {}", describe(result)),
        OutcomeKind::Infrastructure => eprintln!("Internal error: {}", describe(result)),
    }
    if result.truncated {
        eprintln!("(output was truncated at the capture ceiling)");
    }

    if result.is_success() {
        Ok(())
    } else {
        std::process::exit(result.return_code.unwrap_or(1).max(1));
    }
}

fn describe(result: &smelter::ExecutionResult) -> &str {
    result.error.as_deref().unwrap_or("unknown error")
}

async fn run_repl(
    config: Config,
    source: &PathBuf,
    language: LanguageId,
    timeout: Option<u64>,
) -> Result<()> {
    let source_text = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let runner = Runner::new(config);
    let timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| runner.config().default_timeout());

    info!(language = %language, "starting interactive session");
    let mut session = match runner.run_interactive(&source_text, language, timeout).await {
        Ok(session) => session,
        Err(SessionError::Rejected(result)) => {
            eprintln!(
                "Rejected before execution: {}",
                result.error.as_deref().unwrap_or("unknown error")
            );
            if !result.stderr.is_empty() {
                eprintln!("{}", result.stderr);
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("failed to start interactive session"),
    };

    println!("(interactive session started; lines you type go to the program)");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    // Fixed-interval drain keeps rendering independent of process
    // activity and never blocks the input loop.
    let mut tick = tokio::time::interval(Duration::from_millis(50));

    loop {
        tokio::select! {
            _ = tick.tick() => {
                for event in session.poll_events() {
                    render_event(&event);
                }
                if session.state() == SessionState::Idle {
                    break;
                }
            }

            line = input.next_line(), if input_open => {
                match line? {
                    Some(line) => {
                        match session.submit_line(&line).await {
                            Ok(Submission::Sent) => {}
                            Ok(Submission::Command(_)) => {
                                // Process already gone; drain whatever
                                // is left and stop
                            }
                            Err(e) => eprintln!("! failed to send input: {e}"),
                        }
                    }
                    None => {
                        session.close_stdin();
                        input_open = false;
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                session.interrupt();
            }
        }
    }

    Ok(())
}

fn render_event(event: &SessionEvent) {
    match event {
        SessionEvent::Stdout(line) => println!("{line}"),
        SessionEvent::Stderr(line) => eprintln!("! {line}"),
        SessionEvent::Interrupted => eprintln!("^C (process interrupted)"),
        SessionEvent::Exited { return_code } => match return_code {
            Some(0) => println!("(process exited)"),
            Some(code) => println!("(process exited with code {code})"),
            None => println!("(process terminated by signal)"),
        },
    }
}

async fn run_fmt(config: Config, source: &PathBuf, language: LanguageId) -> Result<()> {
    let source_text = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let runner = Runner::new(config);
    match runner.format_code(&source_text, language).await {
        smelter::FormatOutcome::Formatted { source: formatted } => {
            tokio::fs::write(source, formatted)
                .await
                .context("failed to write formatted source")?;
            println!("Formatted {}", source.display());
            Ok(())
        }
        smelter::FormatOutcome::Failed { message } => {
            eprintln!("Formatting failed: {message}");
            std::process::exit(1);
        }
    }
}

fn list_languages(config: Config) {
    let runner = Runner::new(config);
    println!("Configured languages:\n");

    for lang in LanguageId::ALL {
        let info = runner.language_info(lang);
        if info.name.is_empty() {
            continue;
        }
        let lang_type = if info.compiled {
            "compiled"
        } else {
            "interpreted"
        };
        let availability = match info.binary {
            Some(path) => format!("available ({})", path.display()),
            None => "not available".to_owned(),
        };
        println!("  {:<8} {} ({lang_type}) - {availability}", lang.to_string(), info.name);
    }
}

fn show_config(config: Config) {
    let runner = Runner::new(config);
    let info = runner.system_info();

    println!("Default timeout: {:?}", info.default_timeout);
    println!(
        "Memory limit: {:?} bytes",
        info.default_limits.memory_limit
    );
    println!(
        "Output ceiling: {:?} bytes per stream",
        info.default_limits.max_output
    );
    println!("Temp root: {}", info.temp_root.display());
    println!();
    println!(
        "Available languages: {}",
        info.available_languages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
}

async fn init_config(output: &PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
