//! # chainlog
//!
//! Request-scoped structured logging for HTTP services.
//!
//! Every log line produced while serving a request carries the request's
//! correlation id, so one user action can be followed across a chain of
//! services. The crate provides:
//!
//! - [`Logger`] - a cloneable facade dispatching structured [`Entry`]
//!   values through a pluggable [`Transform`] to a [`Sink`]
//! - [`TextTransformer`] / [`JsonTransformer`] - the built-in output
//!   formats; custom transforms can reformat or suppress entries
//! - [`correlation_id`] / [`assign_correlation_id`] - read-or-generate
//!   the id on incoming headers and propagate it to outgoing requests
//! - [`AccessLogLayer`] - a tower middleware emitting one entry per
//!   completed request
//!
//! ## Example
//!
//! ```rust
//! use chainlog::{message, AccessLogLayer, Logger};
//! use http::HeaderMap;
//!
//! let logger = Logger::new();
//!
//! // Handlers log through the same facade the middleware uses; entries
//! // pick up the correlation id from the request headers.
//! let mut headers = HeaderMap::new();
//! let id = chainlog::correlation_id(&mut headers).unwrap();
//! logger.info(Some(&headers), message!("fetching profile for user", 42));
//!
//! // Wrap a tower service so every completed request leaves one entry.
//! let layer = AccessLogLayer::new(logger.clone());
//! # let _ = (layer, id);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Log levels
pub mod level;

// Entries and message parts
pub mod entry;

// Pluggable formatting
pub mod transform;

// Logger facade and sinks
pub mod logger;

// Correlation id management
pub mod correlation;

// Access log middleware
pub mod access_log;

// Error types
pub mod error;

// Re-exports for convenience
pub use access_log::{AccessLog, AccessLogConfig, AccessLogLayer};
pub use correlation::{
    assign_correlation_id, correlation_id, IntoRequestOptions, RequestOptions,
    CORRELATION_ID_HEADER,
};
pub use entry::{Entry, FailureInfo, Message, MessagePart};
pub use error::Error;
pub use level::Level;
pub use logger::{ConsoleSink, Logger, Sink, TracingSink};
pub use transform::{JsonTransformer, TextTransformer, Transform};
