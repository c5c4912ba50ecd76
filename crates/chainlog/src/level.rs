//! Log severity levels
//!
//! Every entry is dispatched together with an explicit [`Level`]. Transforms
//! receive it as a value, so deciding "is this an error?" is an enum match
//! rather than an inspection of which logging function was called.

use std::fmt;

/// Severity attached to a dispatched entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// Diagnostic detail, routed to the debug channel of the sink.
    Debug,
    /// Normal operational events, including access log entries.
    Info,
    /// Something unexpected that did not fail the operation.
    Warn,
    /// A failure; text output carries the `ERR:` marker.
    Error,
}

impl Level {
    /// Lowercase name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Level> for tracing::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Debug => tracing::Level::DEBUG,
            Level::Info => tracing::Level::INFO,
            Level::Warn => tracing::Level::WARN,
            Level::Error => tracing::Level::ERROR,
        }
    }
}
