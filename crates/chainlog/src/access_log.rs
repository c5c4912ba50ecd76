//! Access log middleware
//!
//! [`AccessLogLayer`] wraps a tower service and emits exactly one
//! info-level entry per completed request: the basic-auth username (or a
//! `-` placeholder), status code, method, and decoded path, plus the
//! elapsed milliseconds and the request's correlation id. The id is
//! ensured at ingress, so handlers running under the middleware always
//! see one and the access entry always carries one.
//!
//! # Example
//!
//! ```rust,no_run
//! use chainlog::{AccessLogConfig, AccessLogLayer, Logger};
//! use tower::ServiceBuilder;
//!
//! let logger = Logger::new();
//! let layer = AccessLogLayer::with_config(
//!     logger.clone(),
//!     AccessLogConfig::new().use_json_transformer(true),
//! );
//! let _stack = ServiceBuilder::new().layer(layer);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use http::{HeaderMap, Request, Response};
use tower::{Layer, Service};

use crate::correlation::correlation_id;
use crate::entry::Entry;
use crate::level::Level;
use crate::logger::Logger;
use crate::message;
use crate::transform::JsonTransformer;

/// Configuration accepted by [`AccessLogLayer::with_config`].
///
/// Mirrors the two knobs of the construction contract: explicitly
/// refusing the text transform is the same as requesting the JSON one,
/// and requesting JSON swaps the shared logger's transform at
/// construction time. No configuration ever installs the text transform;
/// it is only ever the pre-existing default.
#[derive(Clone, Debug, Default)]
pub struct AccessLogConfig {
    text_transformer: Option<bool>,
    json_transformer: bool,
}

impl AccessLogConfig {
    /// Create the default configuration, which leaves the logger's
    /// transform untouched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicitly accept or refuse the text transform. Passing `false`
    /// behaves exactly like `use_json_transformer(true)`.
    pub fn use_text_transformer(mut self, use_text: bool) -> Self {
        self.text_transformer = Some(use_text);
        self
    }

    /// Request the JSON transform for the shared logger.
    pub fn use_json_transformer(mut self, use_json: bool) -> Self {
        self.json_transformer = use_json;
        self
    }

    fn wants_json(&self) -> bool {
        self.json_transformer || self.text_transformer == Some(false)
    }
}

/// Tower layer emitting one access log entry per completed request.
///
/// A JSON-requesting configuration installs [`JsonTransformer`] on the
/// supplied logger when the layer is built. The swap is shared by every
/// clone of that logger, so it retargets all logging through it, not just
/// access entries.
#[derive(Clone)]
pub struct AccessLogLayer {
    logger: Logger,
}

impl AccessLogLayer {
    /// Create a layer logging through `logger`, leaving its transform
    /// untouched.
    pub fn new(logger: Logger) -> Self {
        Self::with_config(logger, AccessLogConfig::new())
    }

    /// Create a layer, applying `config` to the shared logger.
    pub fn with_config(logger: Logger, config: AccessLogConfig) -> Self {
        if config.wants_json() {
            logger.set_transform(JsonTransformer::new());
        }
        Self { logger }
    }
}

impl<S> Layer<S> for AccessLogLayer {
    type Service = AccessLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLog {
            inner,
            logger: self.logger.clone(),
        }
    }
}

/// Service produced by [`AccessLogLayer`].
#[derive(Clone)]
pub struct AccessLog<S> {
    inner: S,
    logger: Logger,
}

impl<S, B, ResBody> Service<Request<B>> for AccessLog<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // The original is kept ready by poll_ready; the clone replaces it.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let logger = self.logger.clone();

        let start = Instant::now();
        let id = correlation_id(req.headers_mut()).ok();
        let username = basic_auth_username(req.headers());
        let method = req.method().to_string();
        let path = decoded_path(req.uri().path());

        Box::pin(async move {
            let result = inner.call(req).await;
            let status = match &result {
                Ok(response) => response.status().as_u16(),
                Err(_) => http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            };

            let mut entry = Entry::from_message(None, message!(username, status, method, path))
                .duration(start.elapsed().as_millis() as u64)
                .access_log(true);
            if let Some(id) = id {
                entry = entry.correlation_id(id);
            }
            logger.apply(Level::Info, &entry);

            result
        })
    }
}

fn decoded_path(path: &str) -> String {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => path.to_owned(),
    }
}

fn basic_auth_username(headers: &HeaderMap) -> String {
    parse_basic_username(headers).unwrap_or_else(|| "-".to_owned())
}

fn parse_basic_username(headers: &HeaderMap) -> Option<String> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let value = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let prefix = value.get(..6)?;
    if !prefix.eq_ignore_ascii_case("basic ") {
        return None;
    }
    let decoded = STANDARD.decode(value.get(6..)?.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (name, _password) = credentials.split_once(':')?;
    Some(name.to_owned())
}
