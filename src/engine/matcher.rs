//! Label Pattern Matching
//!
//! Dependency patterns use a two-tier wildcard language:
//! - the pattern is split on the first `/` into a base and a resource path;
//! - in the base, `*` matches within one addressing level (never a `:`);
//! - in the resource path, `*` matches anything, including `:` and `/`.
//!
//! The compiled pattern is anchored and must match the whole action name.
//!
//! # Example
//! ```
//! use actionflow::engine::matcher::LabelPattern;
//!
//! let pattern = LabelPattern::new("ns:*").unwrap();
//! assert!(pattern.matches("ns:foo"));
//! assert!(!pattern.matches("ns:foo:bar"));
//! ```

use std::fmt;

use regex::Regex;

use crate::error::{EngineError, Result};

/// Wildcard within one addressing level.
const BASE_WILDCARD: &str = "[^:]*";

/// Wildcard across levels.
const PATH_WILDCARD: &str = ".*";

/// A compiled dependency pattern.
#[derive(Debug, Clone)]
pub struct LabelPattern {
    source: String,
    regex: Regex,
}

impl LabelPattern {
    /// Compiles a dependency pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let source = pattern.trim().to_string();
        let expression = match source.split_once('/') {
            Some((base, path)) => format!(
                "^{}/{}$",
                translate(base, BASE_WILDCARD),
                translate(path, PATH_WILDCARD)
            ),
            None => format!("^{}$", translate(&source, BASE_WILDCARD)),
        };

        let regex = Regex::new(&expression).map_err(|e| {
            EngineError::InvalidSpec(format!("Invalid dependency pattern '{}': {}", source, e))
        })?;

        Ok(Self { source, regex })
    }

    /// Compiles every pattern in a list.
    pub fn compile_all(patterns: &[String]) -> Result<Vec<Self>> {
        patterns.iter().map(|p| Self::new(p)).collect()
    }

    /// Returns true if `name` matches this pattern in full.
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The pattern as authored.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for LabelPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Escapes literal text and replaces `*` with `wildcard`.
fn translate(segment: &str, wildcard: &str) -> String {
    segment
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(wildcard)
}

/// Returns true if `name` matches `pattern`. Invalid patterns match nothing.
pub fn label_matches(pattern: &str, name: &str) -> bool {
    LabelPattern::new(pattern)
        .map(|p| p.matches(name))
        .unwrap_or(false)
}
