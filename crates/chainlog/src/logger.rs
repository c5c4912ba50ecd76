//! Logger facade, dispatch, and sinks
//!
//! A [`Logger`] owns the active [`Transform`] and a [`Sink`]. Dispatching
//! runs the transform and forwards the formatted line to the sink, or
//! skips the sink entirely when the transform suppresses the entry.
//! Clones share the transform slot, so one logger handed to the access log
//! middleware and to request handlers stays consistently configured.
//!
//! # Example
//!
//! ```rust
//! use chainlog::{message, Logger};
//!
//! let logger = Logger::new();
//! logger.info(None, message!("service started on port", 8080));
//! ```

use std::panic::Location;
use std::sync::{Arc, RwLock};

use http::HeaderMap;

use crate::entry::{Entry, Message};
use crate::level::Level;
use crate::transform::{TextTransformer, Transform};

/// Destination for formatted log lines.
pub trait Sink: Send + Sync {
    /// Write one formatted line at the given level.
    fn write(&self, level: Level, line: &str);
}

/// Default sink forwarding lines to the `tracing` macros under the
/// `chainlog` target, so the host's subscriber controls filtering and
/// output.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create a new tracing sink.
    pub fn new() -> Self {
        Self
    }
}

impl Sink for TracingSink {
    fn write(&self, level: Level, line: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "chainlog", "{}", line),
            Level::Info => tracing::info!(target: "chainlog", "{}", line),
            Level::Warn => tracing::warn!(target: "chainlog", "{}", line),
            Level::Error => tracing::error!(target: "chainlog", "{}", line),
        }
    }
}

/// Plain console sink: debug and info lines go to stdout, warn and error
/// lines to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Create a new console sink.
    pub fn new() -> Self {
        Self
    }
}

impl Sink for ConsoleSink {
    fn write(&self, level: Level, line: &str) {
        match level {
            Level::Debug | Level::Info => println!("{}", line),
            Level::Warn | Level::Error => eprintln!("{}", line),
        }
    }
}

struct Shared {
    transform: RwLock<Arc<dyn Transform>>,
    sink: Arc<dyn Sink>,
}

/// Cloneable logging facade.
///
/// Holds the active transform behind a thread-safe slot; swapping it is
/// expected to be rare (startup, tests) while dispatch only takes a shared
/// read. Concurrent swaps are last-writer-wins.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
}

impl Logger {
    /// Create a logger with the text transform and the tracing sink.
    pub fn new() -> Self {
        Self::with_sink(TracingSink::new())
    }

    /// Create a logger with the text transform and a custom sink.
    pub fn with_sink(sink: impl Sink + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                transform: RwLock::new(Arc::new(TextTransformer::new())),
                sink: Arc::new(sink),
            }),
        }
    }

    /// Install a new transform, shared by all clones of this logger.
    pub fn set_transform(&self, transform: impl Transform + 'static) {
        self.swap_transform(Arc::new(transform));
    }

    /// Install a new transform and return the previously active one, so a
    /// caller can restore it later.
    pub fn swap_transform(&self, transform: Arc<dyn Transform>) -> Arc<dyn Transform> {
        let mut slot = self
            .shared
            .transform
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *slot, transform)
    }

    /// The currently active transform.
    pub fn transform(&self) -> Arc<dyn Transform> {
        self.shared
            .transform
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Run the active transform on `entry` and forward the result to the
    /// sink. A suppressed entry never reaches the sink; otherwise the sink
    /// is called exactly once.
    pub fn apply(&self, level: Level, entry: &Entry) {
        let transform = self.transform();
        if let Some(line) = transform.transform(level, entry) {
            self.shared.sink.write(level, &line);
        }
    }

    /// Build an entry from `headers` and `message`, then dispatch it.
    pub fn log(&self, level: Level, headers: Option<&HeaderMap>, message: impl Into<Message>) {
        let entry = Entry::from_message(headers, message);
        self.apply(level, &entry);
    }

    /// Log at debug level.
    pub fn debug(&self, headers: Option<&HeaderMap>, message: impl Into<Message>) {
        self.log(Level::Debug, headers, message);
    }

    /// Log at info level.
    pub fn info(&self, headers: Option<&HeaderMap>, message: impl Into<Message>) {
        self.log(Level::Info, headers, message);
    }

    /// Log at warn level.
    pub fn warn(&self, headers: Option<&HeaderMap>, message: impl Into<Message>) {
        self.log(Level::Warn, headers, message);
    }

    /// Log at error level.
    pub fn error(&self, headers: Option<&HeaderMap>, message: impl Into<Message>) {
        self.log(Level::Error, headers, message);
    }

    /// Log at info level with the caller's file, line, and column attached
    /// as the entry's source anchor.
    #[track_caller]
    pub fn info_source(&self, headers: Option<&HeaderMap>, message: impl Into<Message>) {
        let location = Location::caller();
        let entry = Entry::from_message(headers, message).source_anchor(
            location.file(),
            location.line(),
            location.column(),
        );
        self.apply(Level::Info, &entry);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}
