//! Pattern matchers for instance routing

use std::fmt;
use std::sync::Arc;
use regex_lite::Regex;
use wildmatch::WildMatch;
use crate::application::errors::RegistryError;
use crate::domain::traits::{CompiledPattern, Matcher};

/// Regular expression matching, unanchored unless the pattern anchors itself
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMatcher;

#[derive(Debug)]
struct RegexPattern(Regex);

impl CompiledPattern for RegexPattern {
    fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Matcher for RegexMatcher {
    fn compile(&self, pattern: &str) -> Result<Arc<dyn CompiledPattern>, RegistryError> {
        let re = Regex::new(pattern).map_err(|e| RegistryError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Arc::new(RegexPattern(re)))
    }
}

/// Whole-body string equality
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

#[derive(Debug)]
struct ExactPattern(String);

impl CompiledPattern for ExactPattern {
    fn is_match(&self, text: &str) -> bool {
        self.0 == text
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

impl Matcher for ExactMatcher {
    fn compile(&self, pattern: &str) -> Result<Arc<dyn CompiledPattern>, RegistryError> {
        Ok(Arc::new(ExactPattern(pattern.to_string())))
    }
}

/// Shell-style globs: `*` for any run of characters, `?` for one.
/// The whole body has to match.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobMatcher;

struct GlobPattern {
    source: String,
    glob: WildMatch,
}

impl fmt::Debug for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobPattern").field(&self.source).finish()
    }
}

impl CompiledPattern for GlobPattern {
    fn is_match(&self, text: &str) -> bool {
        self.glob.matches(text)
    }

    fn as_str(&self) -> &str {
        &self.source
    }
}

impl Matcher for GlobMatcher {
    fn compile(&self, pattern: &str) -> Result<Arc<dyn CompiledPattern>, RegistryError> {
        Ok(Arc::new(GlobPattern {
            source: pattern.to_string(),
            glob: WildMatch::new(pattern),
        }))
    }
}
