//! Diagnostic severity levels.

use std::fmt;

/// Severity of a non-fatal diagnostic emitted through the [`Handler`](super::Handler).
///
/// Fatal conditions never reach here — those are a [`CompileError`](crate::error::CompileError)
/// returned up the call stack instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// `#logi` and informational notices.
    Info,
    /// `#logw` and register over-width warnings.
    Warning,
    /// `#loge` is fatal and never reaches this enum — see
    /// [`CompileError::DirectiveError`](crate::error::CompileError::DirectiveError).
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        };
        write!(f, "{s}")
    }
}
