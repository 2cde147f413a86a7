//! Dangerous-pattern screening
//!
//! A per-language denylist of regular expressions applied to the raw
//! source before any workspace is created or code is executed.
//!
//! This is a heuristic textual screen and nothing more: it is trivially
//! bypassable (string concatenation, aliasing, encodings) and provides
//! no namespace or container isolation. It exists to catch the obvious
//! accidents, not to stop an adversary.

use regex::{Regex, RegexBuilder};

use crate::config::ConfigError;

/// Compiled denylist for one language.
#[derive(Debug, Clone)]
pub struct Denylist {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    regex: Regex,
}

impl Denylist {
    /// Compile a set of patterns, matching case-insensitively.
    pub fn compile(patterns: &[String]) -> Result<Self, ConfigError> {
        let rules = patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| Rule {
                        pattern: pattern.clone(),
                        regex,
                    })
                    .map_err(|e| {
                        ConfigError::Invalid(format!("invalid denylist pattern '{pattern}': {e}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    /// An empty denylist that admits everything.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Return the first matching pattern, or `None` when the source is
    /// admitted.
    pub fn screen(&self, source: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.regex.is_match(source))
            .map(|rule| rule.pattern.as_str())
    }
}
