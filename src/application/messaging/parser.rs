//! Message parser - Minimal shell-like splitting of event bodies

use once_cell::sync::Lazy;
use regex_lite::Regex;
use crate::domain::entities::Event;

static ARGV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'[^']*'|"[^"]*"|\S+"#).expect("argv pattern is valid"));

/// Split `body` into words, keeping single- or double-quoted runs together
/// with the outer quotes removed. No escapes.
pub fn parse_argv(body: &str) -> Vec<String> {
    ARGV_RE
        .find_iter(body.trim())
        .map(|m| strip_quotes(m.as_str()).to_string())
        .collect()
}

// A lone quote character counts as both ends and strips to "".
fn strip_quotes(word: &str) -> &str {
    for quote in ['\'', '"'] {
        if word.starts_with(quote) && word.ends_with(quote) {
            let inner = &word[1..];
            return inner.strip_suffix(quote).unwrap_or(inner);
        }
    }
    word
}

/// Strip a command prefix and name from the start of `body`, returning the
/// remaining arguments. `None` if the body is not that command.
pub fn command_args(body: &str, prefix: &str, command: &str) -> Option<Vec<String>> {
    let mut argv = parse_argv(body).into_iter();
    let first = argv.next()?;
    if first.strip_prefix(prefix)? != command {
        return None;
    }
    Some(argv.collect())
}

impl Event {
    /// The body as an argv-like list, see [`parse_argv`]
    pub fn body_as_argv(&self) -> Vec<String> {
        parse_argv(&self.body)
    }
}
