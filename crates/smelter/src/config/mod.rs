use std::collections::HashMap;
use std::path::PathBuf;

use regex::RegexBuilder;
use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{
    CheckConfig, CommandContext, CompileConfig, DEFAULT_ENTRY_CLASS, EntryPoint, FileExtension,
    LanguageId, RunConfig, Toolchain, extract_public_type,
};
use crate::types::Limits;

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../smelter.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to read config file at {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language '{0}' is not supported")]
    LanguageNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for Smelter
///
/// On disk the language table is keyed by tag strings; keys are parsed
/// into [`LanguageId`] at load time so an unknown tag is a load error,
/// never a silent fall-through.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default resource limits applied to all executions.
    /// Overridden per language or per request where specified.
    pub default_limits: Limits,

    /// Default wall-clock timeout in seconds for one execution
    pub default_timeout_secs: u64,

    /// Toolchain configurations keyed by language tag
    pub languages: HashMap<LanguageId, Toolchain>,
}

/// Serde-facing shape of the config file.
#[derive(Debug, Deserialize)]
pub(crate) struct RawConfig {
    #[serde(default)]
    default_limits: Limits,

    #[serde(default = "default_timeout_secs")]
    default_timeout_secs: u64,

    #[serde(default)]
    languages: HashMap<String, Toolchain>,
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let mut languages = HashMap::new();
        for (key, toolchain) in raw.languages {
            let id: LanguageId = key
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("unknown language tag '{key}'")))?;
            languages.insert(id, toolchain);
        }

        Ok(Config {
            default_limits: raw.default_limits,
            default_timeout_secs: raw.default_timeout_secs,
            languages,
        })
    }
}

impl Config {
    /// Create a new config with the embedded default toolchains
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no toolchains
    pub fn empty() -> Self {
        Self {
            default_limits: Limits::default(),
            default_timeout_secs: default_timeout_secs(),
            languages: HashMap::new(),
        }
    }

    /// Get a toolchain by language tag
    pub fn toolchain(&self, id: LanguageId) -> Result<&Toolchain, ConfigError> {
        self.languages
            .get(&id)
            .ok_or_else(|| ConfigError::LanguageNotFound(id.to_string()))
    }

    /// Merge resource limits with defaults
    pub fn effective_limits(&self, overrides: Option<&Limits>) -> Limits {
        match overrides {
            Some(limits) => self.default_limits.with_overrides(limits),
            None => self.default_limits.clone(),
        }
    }

    /// Default execution timeout
    pub fn default_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.default_timeout_secs)
    }

    /// Validate the configuration
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (id, lang) in &self.languages {
            if lang.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if lang.extension.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty extension"
                )));
            }
            if lang.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
            if let Some(ref compile) = lang.compile
                && compile.command.is_empty()
            {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty compile command"
                )));
            }
            if lang.check.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty check command"
                )));
            }
            for pattern in &lang.denylist {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        ConfigError::Invalid(format!(
                            "language '{id}' has invalid denylist pattern '{pattern}': {e}"
                        ))
                    })?;
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_timeout_secs() -> u64 {
    crate::types::DEFAULT_TIMEOUT.as_secs()
}
