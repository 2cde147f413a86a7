use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;
use crate::types::Limits;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Fallback class name when no public type declaration is found.
pub const DEFAULT_ENTRY_CLASS: &str = "Main";

static PUBLIC_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"public\s+class\s+(\w+)").expect("public class pattern is valid")
});

/// Closed set of supported language tags.
///
/// Dispatch is by exhaustive match over this enum, never by string key;
/// an unknown tag fails at parse time instead of falling through to a
/// default language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    Python,
    Go,
    Java,
    C,
    Cpp,
}

impl LanguageId {
    /// All supported language tags, in display order
    pub const ALL: [LanguageId; 5] = [
        LanguageId::Python,
        LanguageId::Go,
        LanguageId::Java,
        LanguageId::C,
        LanguageId::Cpp,
    ];

    /// The canonical lowercase tag
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageId::Python => "python",
            LanguageId::Go => "go",
            LanguageId::Java => "java",
            LanguageId::C => "c",
            LanguageId::Cpp => "cpp",
        }
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(LanguageId::Python),
            "go" | "golang" => Ok(LanguageId::Go),
            "java" => Ok(LanguageId::Java),
            "c" => Ok(LanguageId::C),
            "cpp" | "c++" | "cxx" => Ok(LanguageId::Cpp),
            other => Err(ConfigError::LanguageNotFound(other.to_owned())),
        }
    }
}

/// Toolchain descriptor for one programming language.
///
/// Static per-language invocation rules: how to name the source file,
/// how to compile it (if at all), how to run it, how to syntax-check it,
/// and which source patterns are denied before execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toolchain {
    /// Human-readable name (e.g., "C (GCC)")
    pub name: String,

    /// File extension
    pub extension: FileExtension,

    /// Compilation configuration (None for interpreted languages)
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    pub run: RunConfig,

    /// Syntax-check configuration
    pub check: CheckConfig,

    /// How the runnable unit's file/class name is derived from source
    #[serde(default)]
    pub entry: EntryPoint,

    /// Dangerous-operation patterns (regular expressions, matched
    /// case-insensitively against the raw source before execution)
    #[serde(default)]
    pub denylist: Vec<String>,
}

impl Toolchain {
    /// Check if the language is compiled
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// The binary probed to decide availability: the compiler for
    /// compiled languages, the interpreter otherwise.
    pub fn probe_binary(&self) -> Option<&str> {
        if let Some(ref compile) = self.compile {
            compile.command.first().map(String::as_str)
        } else {
            self.run.command.first().map(String::as_str)
        }
    }

    /// Source file name for the given source text.
    ///
    /// Entry-point extraction only affects languages whose runnable unit
    /// name must match the file name (Java).
    pub fn source_name(&self, source: &str) -> String {
        match self.entry {
            EntryPoint::Fixed => format!("main.{}", self.extension),
            EntryPoint::PublicType => {
                format!("{}.{}", extract_public_type(source), self.extension)
            }
        }
    }

    /// Runnable unit name for the run command's `{class}` placeholder.
    pub fn entry_class(&self, source: &str) -> String {
        match self.entry {
            EntryPoint::Fixed => String::new(),
            EntryPoint::PublicType => extract_public_type(source).to_owned(),
        }
    }

    /// Expand placeholders in the given command template.
    ///
    /// `{source}` is the source file path, `{binary}` the build artifact
    /// path, `{class}` the runnable unit name, `{dir}` the scratch
    /// directory.
    pub fn expand_command(command: &[String], ctx: &CommandContext<'_>) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", ctx.source)
                    .replace("{binary}", ctx.binary)
                    .replace("{class}", ctx.class)
                    .replace("{dir}", ctx.dir)
            })
            .collect()
    }
}

/// Concrete values substituted into a command template.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandContext<'a> {
    pub source: &'a str,
    pub binary: &'a str,
    pub class: &'a str,
    pub dir: &'a str,
}

/// Locate the first `public class X` declaration in the source.
///
/// Best-effort textual heuristic: multiple declarations yield the first
/// match, none yields [`DEFAULT_ENTRY_CLASS`].
pub fn extract_public_type(source: &str) -> &str {
    PUBLIC_CLASS_RE
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(DEFAULT_ENTRY_CLASS)
}

/// File extension without dot (e.g., "cpp")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the runnable unit's name is derived from the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    /// Source is always written as `main.<ext>`
    #[default]
    Fixed,

    /// File and run-class name come from the first `public class X`
    /// declaration, falling back to `Main`
    PublicType,
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    pub command: Vec<String>,

    /// Build artifact name inside the scratch directory (e.g., "main");
    /// empty for toolchains whose compiler derives its own output name
    #[serde(default)]
    pub output_name: String,

    /// Resource limits for compilation (overrides the compile defaults)
    #[serde(default)]
    pub limits: Option<Limits>,
}

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    pub command: Vec<String>,

    /// Resource limits for execution (overrides defaults)
    #[serde(default)]
    pub limits: Option<Limits>,
}

fn default_check_timeout() -> u64 {
    10
}

/// Configuration for the static syntax check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Command and arguments with placeholders; a syntax-only flag where
    /// the compiler supports one, else a full compile to a discarded
    /// target
    pub command: Vec<String>,

    /// Checker budget in seconds, independent of the execution timeout
    #[serde(default = "default_check_timeout")]
    pub timeout_secs: u64,
}
