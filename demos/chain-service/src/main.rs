//! Chained-service demo for chainlog
//!
//! This demo shows:
//! - One access log entry per request, correlation id included
//! - Handler logging that shares the request's correlation id
//! - Source-anchored info lines and failure capture
//! - Forwarding the id to a downstream hop with `assign_correlation_id`
//! - Swapping a custom "quiet" transform in and out at runtime
//!
//! Run with: cargo run -p chain-service
//! Then test:
//!   curl http://127.0.0.1:3000/
//!   curl -H 'x-correlation-id: 12345' http://127.0.0.1:3000/relay
//!   curl -u alice:secret http://127.0.0.1:3000/widgets
//!   curl http://127.0.0.1:3000/oops
//!   curl -X POST http://127.0.0.1:3000/quiet   (plain info lines go away)
//!   curl -X POST http://127.0.0.1:3000/loud    (and come back)

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chainlog::{
    assign_correlation_id, failure, message, AccessLogLayer, ConsoleSink, Entry, Level, Logger,
    Transform, CORRELATION_ID_HEADER,
};
use chrono::SecondsFormat;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tower::{Layer, ServiceExt};
use tracing::{error, info};

/// The previously active transform, kept so `/loud` can restore it.
type SavedTransform = Arc<Mutex<Option<Arc<dyn Transform>>>>;

// ============================================
// Quiet Transform
// ============================================

/// Quiet mode: drop plain info entries, keep access logs, and render the
/// consumer `suffix` field after a comma.
fn quiet_transform(level: Level, entry: &Entry) -> Option<String> {
    if !entry.is_access_log && level == Level::Info {
        return None;
    }
    let mut line = format!(
        "{} {}",
        entry
            .process_time
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        entry.message
    );
    if let Some(ref suffix) = entry.suffix {
        line.push_str(&format!(" , {}", suffix));
    }
    Some(line)
}

// ============================================
// Handlers
// ============================================

fn index(logger: &Logger, req: &Request<Incoming>) -> Response<Full<Bytes>> {
    logger.error(Some(req.headers()), message!("errors are logged"));
    logger.info(
        Some(req.headers()),
        message!("info - not logged in quiet mode"),
    );
    plain(
        StatusCode::OK,
        "chainlog demo\n\
         GET  /relay    forward the correlation id one hop\n\
         GET  /widgets  list widgets (try curl -u alice:secret)\n\
         GET  /oops     capture a failure\n\
         POST /quiet    swap in the quiet transform\n\
         POST /loud     restore the previous transform\n",
    )
}

fn relay(logger: &Logger, req: &mut Request<Incoming>) -> Response<Full<Bytes>> {
    match assign_correlation_id(req.headers_mut(), "http://127.0.0.1:3000/widgets") {
        Ok(options) => {
            logger.info(
                Some(req.headers()),
                message!("forwarding to", options.uri.to_string()),
            );
            let id = options.headers[CORRELATION_ID_HEADER]
                .to_str()
                .unwrap_or("?")
                .to_owned();
            plain(StatusCode::OK, format!("forwarded with {}\n", id))
        }
        Err(err) => {
            logger.error(
                Some(req.headers()),
                message!(failure!(err), "while assigning the id"),
            );
            plain(StatusCode::INTERNAL_SERVER_ERROR, "relay failed\n")
        }
    }
}

fn widgets(logger: &Logger, req: &Request<Incoming>) -> Response<Full<Bytes>> {
    logger.info_source(Some(req.headers()), message!("listing", 3, "widgets"));
    plain(StatusCode::OK, "anvil\nrope\nmagnet\n")
}

fn oops(logger: &Logger, req: &Request<Incoming>) -> Response<Full<Bytes>> {
    let cache = std::io::Error::new(std::io::ErrorKind::NotFound, "widget cache is missing");
    logger.error(
        Some(req.headers()),
        message!(failure!(cache), "while warming the cache"),
    );
    plain(StatusCode::INTERNAL_SERVER_ERROR, "oops\n")
}

fn quiet_on(logger: &Logger, saved: &SavedTransform) -> Response<Full<Bytes>> {
    let mut saved = saved.lock().unwrap();
    if saved.is_none() {
        *saved = Some(logger.swap_transform(Arc::new(quiet_transform)));

        let hint = Entry::new("call: curl http://127.0.0.1:3000/").suffix("please");
        logger.apply(Level::Warn, &hint);
    }
    plain(StatusCode::OK, "quiet mode on\n")
}

fn quiet_off(logger: &Logger, saved: &SavedTransform) -> Response<Full<Bytes>> {
    if let Some(previous) = saved.lock().unwrap().take() {
        logger.swap_transform(previous);
    }
    plain(StatusCode::OK, "quiet mode off\n")
}

fn plain(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .body(Full::new(body.into()))
        .unwrap()
}

// ============================================
// Router
// ============================================

async fn route(
    logger: Logger,
    saved: SavedTransform,
    mut req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match path.as_str() {
        "/" if method == Method::GET => index(&logger, &req),
        "/relay" if method == Method::GET => relay(&logger, &mut req),
        "/widgets" if method == Method::GET => widgets(&logger, &req),
        "/oops" if method == Method::GET => oops(&logger, &req),
        "/quiet" if method == Method::POST => quiet_on(&logger, &saved),
        "/loud" if method == Method::POST => quiet_off(&logger, &saved),
        _ => {
            logger.warn(
                Some(req.headers()),
                message!("no route for", path.as_str()),
            );
            plain(StatusCode::NOT_FOUND, "not found\n")
        }
    };

    Ok(response)
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chain_service=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    let logger = Logger::with_sink(ConsoleSink::new());
    let saved: SavedTransform = Arc::new(Mutex::new(None));

    let addr: SocketAddr = "127.0.0.1:3000".parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("🚀 chain-service running on http://{}", addr);

    logger.warn(None, message!(format!("call: curl http://{}/", addr)));

    loop {
        let (stream, _remote_addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let logger = logger.clone();
        let saved = saved.clone();

        tokio::spawn(async move {
            let stack = AccessLogLayer::new(logger.clone()).layer(tower::service_fn(
                move |req: Request<Incoming>| {
                    let logger = logger.clone();
                    let saved = saved.clone();
                    async move { route(logger, saved, req).await }
                },
            ));

            let service = hyper::service::service_fn(move |req: Request<Incoming>| {
                let stack = stack.clone();
                async move { stack.oneshot(req).await }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("connection error: {}", err);
            }
        });
    }
}
