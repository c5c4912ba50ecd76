//! Pluggable entry formatting
//!
//! A [`Transform`] turns a `(level, entry)` pair into the line handed to
//! the sink, or returns `None` to suppress the sink call entirely. Two
//! transforms are built in: [`TextTransformer`] for human-readable output
//! and [`JsonTransformer`] for one-line JSON. Plain closures implement the
//! trait too, so installing an ad-hoc filter is a one-liner.
//!
//! # Example
//!
//! ```rust
//! use chainlog::{Entry, Level, TextTransformer, Transform};
//!
//! let entry = Entry::new("foo").correlation_id("12345");
//! let line = TextTransformer::new()
//!     .transform(Level::Error, &entry)
//!     .unwrap();
//! assert!(line.contains("ERR: foo"));
//! assert!(line.contains("(c:12345)"));
//! ```

use chrono::SecondsFormat;

use crate::entry::Entry;
use crate::level::Level;

/// Strategy mapping an entry to formatted output or suppression.
pub trait Transform: Send + Sync {
    /// Format `entry` for `level`; `None` suppresses the sink call.
    fn transform(&self, level: Level, entry: &Entry) -> Option<String>;
}

impl<F> Transform for F
where
    F: Fn(Level, &Entry) -> Option<String> + Send + Sync,
{
    fn transform(&self, level: Level, entry: &Entry) -> Option<String> {
        self(level, entry)
    }
}

/// Human-readable single-line transform. The default.
///
/// Renders the timestamp, an `ERR:` marker for error-level entries, the
/// message, then `(c:<id>)` and `(d:<ms>ms)` when present. A source anchor
/// renders as `in <file>:<line>:<column>` only when no stack is present;
/// a stack renders on its own line. Never suppresses.
#[derive(Clone, Debug, Default)]
pub struct TextTransformer;

impl TextTransformer {
    /// Create a new text transformer.
    pub fn new() -> Self {
        Self
    }
}

impl Transform for TextTransformer {
    fn transform(&self, level: Level, entry: &Entry) -> Option<String> {
        let mut result = entry
            .process_time
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        if level == Level::Error {
            result.push_str(" ERR:");
        }
        result.push(' ');
        result.push_str(&entry.message);
        if let Some(ref id) = entry.correlation_id {
            result.push_str(&format!(" (c:{})", id));
        }
        if let Some(duration) = entry.duration {
            result.push_str(&format!(" (d:{}ms)", duration));
        }
        if entry.stack.is_none() {
            if let (Some(file), Some(line), Some(column)) = (&entry.file, entry.line, entry.column)
            {
                result.push_str(&format!(" in {}:{}:{}", file, line, column));
            }
        }
        if let Some(ref stack) = entry.stack {
            result.push('\n');
            result.push_str(stack);
        }
        Some(result)
    }
}

/// One-line JSON transform.
///
/// Serializes the whole entry with camelCase keys, omitting unset fields.
/// The access log marker is routing state, not payload, and is absent from
/// the output. Never suppresses.
#[derive(Clone, Debug, Default)]
pub struct JsonTransformer;

impl JsonTransformer {
    /// Create a new JSON transformer.
    pub fn new() -> Self {
        Self
    }
}

impl Transform for JsonTransformer {
    fn transform(&self, _level: Level, entry: &Entry) -> Option<String> {
        serde_json::to_string(entry).ok()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The message always survives text transformation verbatim.
        #[test]
        fn prop_text_contains_message(message in "[a-zA-Z0-9 _.-]{1,40}") {
            let entry = Entry::new(message.clone());
            let line = TextTransformer::new().transform(Level::Info, &entry).unwrap();
            prop_assert!(line.contains(&message));
        }

        /// The error marker appears exactly for error-level entries.
        #[test]
        fn prop_err_marker_tracks_level(message in "[a-z]{1,20}") {
            let entry = Entry::new(message);
            for level in [Level::Debug, Level::Info, Level::Warn, Level::Error] {
                let line = TextTransformer::new().transform(level, &entry).unwrap();
                prop_assert_eq!(line.contains(" ERR:"), level == Level::Error);
            }
        }

        /// JSON output always parses and never leaks the routing marker.
        #[test]
        fn prop_json_parses_without_marker(message in ".{0,40}", access in proptest::bool::ANY) {
            let entry = Entry::new(message).access_log(access);
            let line = JsonTransformer::new().transform(Level::Info, &entry).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
            prop_assert!(parsed.get("isAccessLog").is_none());
            prop_assert!(parsed.get("message").is_some());
        }
    }
}
