//! Log entries and message parts
//!
//! An [`Entry`] is one structured record describing a log event before
//! formatting. Entries are built from a [`Message`], an ordered list of
//! [`MessagePart`] values: plain text, arbitrary JSON values, or captured
//! failures. Failure parts carry the capture site and an optional rendered
//! backtrace, so an error message containing line breaks can never shift
//! the recorded source anchor.
//!
//! # Example
//!
//! ```rust
//! use chainlog::{message, Entry};
//!
//! let entry = Entry::from_message(None, message!("user", 42, "logged in"));
//! assert_eq!(entry.message, "user 42 logged in");
//! ```

use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::Location;

use chrono::{DateTime, SecondsFormat, Utc};
use http::HeaderMap;
use serde::Serialize;

use crate::correlation::CORRELATION_ID_HEADER;

/// One structured log event before formatting.
///
/// `message` and `process_time` are always populated; everything else is
/// optional. The `is_access_log` marker is internal routing state for
/// transforms and is never serialized.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Rendered message text.
    pub message: String,
    /// Time the entry was built, serialized as ISO-8601 with millisecond
    /// precision and a `Z` suffix.
    #[serde(serialize_with = "serialize_process_time")]
    pub process_time: DateTime<Utc>,
    /// Correlation id copied from the request, when one was present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Elapsed time in milliseconds, set by the access log middleware.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Source file of the anchor, when one was captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Source line of the anchor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Source column of the anchor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    /// Rendered backtrace of a captured failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Consumer-defined extra field, set by custom transforms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Marks entries emitted by the access log middleware. Transforms may
    /// route on it; it never appears in serialized output.
    #[serde(skip)]
    pub is_access_log: bool,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            message: String::new(),
            process_time: Utc::now(),
            correlation_id: None,
            duration: None,
            file: None,
            line: None,
            column: None,
            stack: None,
            suffix: None,
            is_access_log: false,
        }
    }
}

impl Entry {
    /// Create an entry with the given message and the current timestamp.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Build an entry from request headers and a message.
    ///
    /// Failure parts contribute the source anchor and backtrace; their
    /// display text joins the message in place. When several failure parts
    /// are present the last one wins. If `headers` carry a readable
    /// correlation id it is copied onto the entry; building never fails.
    pub fn from_message(headers: Option<&HeaderMap>, message: impl Into<Message>) -> Self {
        let message = message.into();
        let mut entry = Entry::default();

        if let Some(headers) = headers {
            if let Some(value) = headers.get(CORRELATION_ID_HEADER) {
                if let Ok(id) = value.to_str() {
                    entry.correlation_id = Some(id.to_owned());
                }
            }
        }

        let mut rendered = Vec::with_capacity(message.parts().len());
        for part in message.parts() {
            match part {
                MessagePart::Text(text) => rendered.push(text.clone()),
                MessagePart::Value(value) => rendered.push(value.to_string()),
                MessagePart::Failure(failure) => {
                    entry.file = Some(failure.file().to_owned());
                    entry.line = Some(failure.line());
                    entry.column = Some(failure.column());
                    entry.stack = failure.backtrace().map(str::to_owned);
                    rendered.push(failure.text().to_owned());
                }
            }
        }
        entry.message = rendered.join(" ");
        entry
    }

    /// Set the correlation id.
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set the elapsed duration in milliseconds.
    pub fn duration(mut self, millis: u64) -> Self {
        self.duration = Some(millis);
        self
    }

    /// Set the source anchor.
    pub fn source_anchor(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Set the rendered backtrace.
    pub fn stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Set the consumer-defined suffix field.
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Mark or unmark the entry as an access log entry.
    pub fn access_log(mut self, is_access_log: bool) -> Self {
        self.is_access_log = is_access_log;
        self
    }
}

fn serialize_process_time<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// One component of a log message.
#[derive(Clone, Debug)]
pub enum MessagePart {
    /// Plain text, rendered as-is.
    Text(String),
    /// An arbitrary value, rendered as compact JSON.
    Value(serde_json::Value),
    /// A captured failure, rendered as its display text; contributes the
    /// entry's source anchor and backtrace.
    Failure(FailureInfo),
}

impl From<&str> for MessagePart {
    fn from(text: &str) -> Self {
        MessagePart::Text(text.to_owned())
    }
}

impl From<String> for MessagePart {
    fn from(text: String) -> Self {
        MessagePart::Text(text)
    }
}

impl From<serde_json::Value> for MessagePart {
    fn from(value: serde_json::Value) -> Self {
        MessagePart::Value(value)
    }
}

impl From<FailureInfo> for MessagePart {
    fn from(failure: FailureInfo) -> Self {
        MessagePart::Failure(failure)
    }
}

macro_rules! part_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for MessagePart {
                fn from(value: $ty) -> Self {
                    MessagePart::Value(serde_json::Value::from(value))
                }
            }
        )*
    };
}

part_from_value!(bool, i32, i64, u16, u32, u64, f64);

/// A failure captured for logging: display text, capture site, and an
/// optional rendered backtrace.
///
/// The backtrace is stored only when the environment enables capture
/// (`RUST_BACKTRACE=1` or `RUST_LIB_BACKTRACE=1`); the capture site is
/// always recorded.
#[derive(Clone, Debug)]
pub struct FailureInfo {
    text: String,
    location: &'static Location<'static>,
    backtrace: Option<String>,
}

impl FailureInfo {
    /// Capture an error together with the caller's source location.
    #[track_caller]
    pub fn capture<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let backtrace = Backtrace::capture();
        Self {
            text: error.to_string(),
            location: Location::caller(),
            backtrace: match backtrace.status() {
                BacktraceStatus::Captured => Some(backtrace.to_string()),
                _ => None,
            },
        }
    }

    /// The error's display text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Source file of the capture site.
    pub fn file(&self) -> &'static str {
        self.location.file()
    }

    /// Source line of the capture site.
    pub fn line(&self) -> u32 {
        self.location.line()
    }

    /// Source column of the capture site.
    pub fn column(&self) -> u32 {
        self.location.column()
    }

    /// The rendered backtrace, when one was captured.
    pub fn backtrace(&self) -> Option<&str> {
        self.backtrace.as_deref()
    }
}

/// An ordered list of message parts.
#[derive(Clone, Debug, Default)]
pub struct Message {
    parts: Vec<MessagePart>,
}

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part.
    pub fn push(&mut self, part: impl Into<MessagePart>) {
        self.parts.push(part.into());
    }

    /// Append a part, builder-style.
    pub fn with(mut self, part: impl Into<MessagePart>) -> Self {
        self.push(part);
        self
    }

    /// The parts in order.
    pub fn parts(&self) -> &[MessagePart] {
        &self.parts
    }

    /// Whether the message has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl From<MessagePart> for Message {
    fn from(part: MessagePart) -> Self {
        Self { parts: vec![part] }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        MessagePart::from(text).into()
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        MessagePart::from(text).into()
    }
}

impl From<Vec<MessagePart>> for Message {
    fn from(parts: Vec<MessagePart>) -> Self {
        Self { parts }
    }
}

impl FromIterator<MessagePart> for Message {
    fn from_iter<I: IntoIterator<Item = MessagePart>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}

/// Build a [`Message`] from a comma-separated list of parts.
///
/// Accepts anything convertible into a [`MessagePart`]: string slices,
/// owned strings, numbers, booleans, `serde_json::Value`, or captured
/// failures.
///
/// # Example
///
/// ```rust
/// use chainlog::message;
///
/// let message = message!("request finished with", 200u16);
/// assert_eq!(message.parts().len(), 2);
/// ```
#[macro_export]
macro_rules! message {
    () => {
        $crate::Message::new()
    };
    ($($part:expr),+ $(,)?) => {{
        let mut message = $crate::Message::new();
        $(message.push($crate::MessagePart::from($part));)+
        message
    }};
}

/// Capture an error value as a failure [`MessagePart`], recording the
/// call site as the entry's source anchor.
///
/// # Example
///
/// ```rust
/// use chainlog::{failure, message, Entry};
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "boom");
/// let entry = Entry::from_message(None, message!(failure!(error), "while syncing"));
/// assert!(entry.message.starts_with("boom"));
/// assert!(entry.line.is_some());
/// ```
#[macro_export]
macro_rules! failure {
    ($error:expr) => {
        $crate::MessagePart::Failure($crate::FailureInfo::capture(&$error))
    };
}
