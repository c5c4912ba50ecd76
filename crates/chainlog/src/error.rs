//! Error types for correlation id handling
//!
//! All failures in this crate are synchronous and surface directly to the
//! caller; nothing is retried or deferred. Logging itself never fails.
//! Only the correlation id operations do, and only when their inputs are
//! unusable.

use thiserror::Error;

/// Errors returned by the correlation id operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The stored correlation id header exists but its value is not
    /// readable as a string.
    #[error("correlation id header is not a valid string: {0}")]
    InvalidRequest(#[from] http::header::ToStrError),

    /// The outgoing request options could not be built because the URI
    /// failed to parse.
    #[error("invalid outgoing request options: {0}")]
    InvalidOptions(#[from] http::uri::InvalidUri),
}
