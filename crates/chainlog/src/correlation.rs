//! Correlation id management and propagation
//!
//! A correlation id ties together every log entry produced while serving
//! one request, across service boundaries. The id lives in the
//! [`CORRELATION_ID_HEADER`] header of the incoming request: reading it
//! through [`correlation_id`] generates and stores a UUID v4 on first
//! access, and [`assign_correlation_id`] copies it onto the headers of an
//! outgoing request so downstream services join the same chain.
//!
//! # Example
//!
//! ```rust
//! use chainlog::{assign_correlation_id, correlation_id};
//! use http::HeaderMap;
//!
//! let mut headers = HeaderMap::new();
//! let id = correlation_id(&mut headers).unwrap();
//! assert_eq!(id.len(), 36);
//!
//! let outgoing = assign_correlation_id(&mut headers, "http://example.com").unwrap();
//! assert_eq!(
//!     outgoing.headers["x-correlation-id"].to_str().unwrap(),
//!     id
//! );
//! ```

use http::header::HeaderValue;
use http::{HeaderMap, Uri};
use uuid::Uuid;

use crate::error::Error;

/// Header carrying the request correlation id.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Read the request's correlation id, generating one if needed.
///
/// Returns the id already stored on `headers`, or generates a new
/// hyphenated UUID v4 (36 characters), stores it under
/// [`CORRELATION_ID_HEADER`] and returns it. Once assigned the id is
/// stable: repeated lookups on the same headers return the identical
/// value.
///
/// Fails with [`Error::InvalidRequest`] when the stored header value is
/// not readable as a string.
pub fn correlation_id(headers: &mut HeaderMap) -> Result<String, Error> {
    if let Some(value) = headers.get(CORRELATION_ID_HEADER) {
        return Ok(value.to_str()?.to_owned());
    }
    let id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&id) {
        headers.insert(CORRELATION_ID_HEADER, value);
    }
    Ok(id)
}

/// Ensure the request has a correlation id and copy it onto outgoing
/// request options.
///
/// `options` may be ready-made [`RequestOptions`], a parsed [`Uri`], or a
/// bare URI string, which is coerced into options for that URI. The
/// incoming `headers` gain an id if they had none; the returned options
/// carry the same id in their header map.
///
/// Fails with [`Error::InvalidOptions`] when a URI string does not parse,
/// or with [`Error::InvalidRequest`] when the stored id is not readable.
pub fn assign_correlation_id(
    headers: &mut HeaderMap,
    options: impl IntoRequestOptions,
) -> Result<RequestOptions, Error> {
    let mut options = options.into_request_options()?;
    let id = correlation_id(headers)?;
    if let Ok(value) = HeaderValue::from_str(&id) {
        options.headers.insert(CORRELATION_ID_HEADER, value);
    }
    Ok(options)
}

/// Options for an outgoing HTTP request: the target URI plus the headers
/// to send with it.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Target URI of the outgoing request.
    pub uri: Uri,
    /// Headers sent with the outgoing request.
    pub headers: HeaderMap,
}

impl RequestOptions {
    /// Create options for the given URI with an empty header map.
    pub fn new(uri: Uri) -> Self {
        Self {
            uri,
            headers: HeaderMap::new(),
        }
    }
}

/// Conversion into [`RequestOptions`].
///
/// Implemented for ready-made options, parsed URIs, and bare URI strings.
pub trait IntoRequestOptions {
    /// Convert into request options.
    fn into_request_options(self) -> Result<RequestOptions, Error>;
}

impl IntoRequestOptions for RequestOptions {
    fn into_request_options(self) -> Result<RequestOptions, Error> {
        Ok(self)
    }
}

impl IntoRequestOptions for Uri {
    fn into_request_options(self) -> Result<RequestOptions, Error> {
        Ok(RequestOptions::new(self))
    }
}

impl IntoRequestOptions for &str {
    fn into_request_options(self) -> Result<RequestOptions, Error> {
        Ok(RequestOptions::new(self.parse::<Uri>()?))
    }
}

impl IntoRequestOptions for String {
    fn into_request_options(self) -> Result<RequestOptions, Error> {
        self.as_str().into_request_options()
    }
}
