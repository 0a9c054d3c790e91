use std::fmt;
use std::sync::Arc;
use crate::application::errors::RegistryError;

/// A pattern compiled once at instance registration.
///
/// Matching must be a pure function of the pattern and the text.
pub trait CompiledPattern: Send + Sync + fmt::Debug {
    fn is_match(&self, text: &str) -> bool;

    /// The source the pattern was compiled from
    fn as_str(&self) -> &str;
}

/// Turns pattern sources into compiled patterns.
///
/// The registry only depends on this trait, so regex, glob or exact
/// matching can be swapped without touching registration or routing.
pub trait Matcher: Send + Sync {
    fn compile(&self, pattern: &str) -> Result<Arc<dyn CompiledPattern>, RegistryError>;
}
