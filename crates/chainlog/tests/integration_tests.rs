//! Integration tests for chainlog
//!
//! These tests cover cross-cutting behavior that single modules cannot:
//! one logger shared between handlers and the access log middleware,
//! correlation ids flowing across a chain hop, and transform swaps
//! observed end to end.

use std::sync::{Arc, Mutex};

use chainlog::{Level, Logger, Sink};

#[derive(Clone, Default)]
struct RecordingSink {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl RecordingSink {
    fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().unwrap().clone()
    }
}

impl Sink for RecordingSink {
    fn write(&self, level: Level, line: &str) {
        self.lines.lock().unwrap().push((level, line.to_owned()));
    }
}

fn recording_logger() -> (Logger, RecordingSink) {
    let sink = RecordingSink::default();
    (Logger::with_sink(sink.clone()), sink)
}

// ============================================================================
// Request Chain Tests
// ============================================================================

mod request_chain_tests {
    use super::*;
    use bytes::Bytes;
    use chainlog::{assign_correlation_id, message, AccessLogLayer, CORRELATION_ID_HEADER};
    use http::{Request, Response};
    use http_body_util::Full;
    use std::convert::Infallible;
    use tower::{service_fn, Layer, ServiceExt};

    #[tokio::test]
    async fn handler_and_access_entry_share_one_generated_id() {
        let (logger, sink) = recording_logger();
        let handler_logger = logger.clone();

        let service = AccessLogLayer::new(logger).layer(service_fn(move |req: Request<()>| {
            let logger = handler_logger.clone();
            async move {
                logger.info(Some(req.headers()), message!("handling", req.uri().path()));
                Ok::<_, Infallible>(
                    Response::builder()
                        .status(204)
                        .body(Full::new(Bytes::new()))
                        .unwrap(),
                )
            }
        }));

        let request = Request::builder()
            .method("GET")
            .uri("/orders")
            .body(())
            .unwrap();
        service.oneshot(request).await.unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 2, "one handler entry plus one access entry");
        assert!(lines[0].1.contains("handling /orders"));
        assert!(lines[1].1.contains("- 204 GET /orders"));

        // Both entries carry the id generated at ingress.
        let id_of = |line: &str| {
            let start = line.find("(c:").expect("entry should carry an id") + 3;
            line[start..start + 36].to_owned()
        };
        assert_eq!(id_of(&lines[0].1), id_of(&lines[1].1));
    }

    #[tokio::test]
    async fn supplied_id_survives_one_chain_hop() {
        // One hop of a service chain: the id arrives on the incoming
        // request and is copied onto the options for a downstream call.
        let (logger, sink) = recording_logger();
        let forwarded = Arc::new(Mutex::new(None::<String>));
        let forwarded_in_handler = forwarded.clone();

        let service =
            AccessLogLayer::new(logger).layer(service_fn(move |mut req: Request<()>| {
                let forwarded = forwarded_in_handler.clone();
                async move {
                    let options =
                        assign_correlation_id(req.headers_mut(), "http://downstream/api")
                            .unwrap();
                    let id = options.headers[CORRELATION_ID_HEADER]
                        .to_str()
                        .unwrap()
                        .to_owned();
                    *forwarded.lock().unwrap() = Some(id);
                    Ok::<_, Infallible>(
                        Response::builder()
                            .status(200)
                            .body(Full::new(Bytes::new()))
                            .unwrap(),
                    )
                }
            }));

        let request = Request::builder()
            .uri("/relay")
            .header(CORRELATION_ID_HEADER, "hop-42")
            .body(())
            .unwrap();
        service.oneshot(request).await.unwrap();

        assert_eq!(forwarded.lock().unwrap().as_deref(), Some("hop-42"));
        assert!(sink.lines()[0].1.contains("(c:hop-42)"));
    }

    #[tokio::test]
    async fn dropped_request_future_emits_nothing() {
        let (logger, sink) = recording_logger();
        let service = AccessLogLayer::new(logger).layer(service_fn(|_req: Request<()>| async {
            std::future::pending::<()>().await;
            Ok::<_, Infallible>(
                Response::builder()
                    .status(200)
                    .body(Full::new(Bytes::new()))
                    .unwrap(),
            )
        }));

        let request = Request::builder().uri("/never").body(()).unwrap();
        let pending = service.oneshot(request);
        tokio::select! {
            _ = pending => panic!("the handler never completes"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(20)) => {}
        }

        assert!(sink.lines().is_empty(), "a dropped request logs nothing");
    }
}

// ============================================================================
// Custom Transform Tests
// ============================================================================

mod custom_transform_tests {
    use super::*;
    use chainlog::{message, AccessLogLayer, Entry};
    use chrono::SecondsFormat;
    use http::{Request, Response};
    use std::convert::Infallible;
    use tower::{service_fn, Layer, ServiceExt};

    /// Renders `processTime message` plus a trailing `, suffix`, dropping
    /// plain info entries while keeping access logs.
    fn quiet_text(level: Level, entry: &Entry) -> Option<String> {
        if !entry.is_access_log && level == Level::Info {
            return None;
        }
        let mut line = format!(
            "{} {}",
            entry.process_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            entry.message
        );
        if let Some(suffix) = &entry.suffix {
            line.push_str(&format!(" , {}", suffix));
        }
        Some(line)
    }

    #[tokio::test]
    async fn suppresses_handler_info_but_keeps_access_and_error_entries() {
        let (logger, sink) = recording_logger();
        logger.set_transform(quiet_text);
        let handler_logger = logger.clone();

        let service = AccessLogLayer::new(logger).layer(service_fn(move |req: Request<()>| {
            let logger = handler_logger.clone();
            async move {
                logger.error(Some(req.headers()), message!("errors are logged"));
                logger.info(Some(req.headers()), message!("info - not logged"));
                Ok::<_, Infallible>(Response::builder().status(204).body(String::new()).unwrap())
            }
        }));

        let request = Request::builder().uri("/").body(()).unwrap();
        service.oneshot(request).await.unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 2, "the plain info entry should be dropped");
        assert_eq!(lines[0].0, Level::Error);
        assert!(lines[0].1.contains("errors are logged"));
        assert_eq!(lines[1].0, Level::Info);
        assert!(lines[1].1.contains("- 204 GET /"));
    }

    #[test]
    fn renders_suffix_after_a_comma() {
        let (logger, sink) = recording_logger();
        logger.set_transform(quiet_text);

        let entry = Entry::new("call back").suffix("please");
        logger.apply(Level::Warn, &entry);

        let line = &sink.lines()[0].1;
        assert!(line.ends_with("call back , please"));
    }
}

// ============================================================================
// JSON Pipeline Tests
// ============================================================================

mod json_pipeline_tests {
    use super::*;
    use chainlog::{failure, message, AccessLogConfig, AccessLogLayer, CORRELATION_ID_HEADER};
    use http::{Request, Response};
    use std::convert::Infallible;
    use std::io;
    use tower::{service_fn, Layer, ServiceExt};

    #[tokio::test]
    async fn json_mode_covers_handler_and_access_entries() {
        let (logger, sink) = recording_logger();
        let handler_logger = logger.clone();

        let service = AccessLogLayer::with_config(
            logger,
            AccessLogConfig::new().use_json_transformer(true),
        )
        .layer(service_fn(move |req: Request<()>| {
            let logger = handler_logger.clone();
            async move {
                let missing = io::Error::new(io::ErrorKind::NotFound, "no such widget");
                logger.error(Some(req.headers()), message!(failure!(missing)));
                Ok::<_, Infallible>(Response::builder().status(404).body(String::new()).unwrap())
            }
        }));

        let request = Request::builder()
            .uri("/widgets/9")
            .header(CORRELATION_ID_HEADER, "abc-123")
            .body(())
            .unwrap();
        service.oneshot(request).await.unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);

        let error: serde_json::Value = serde_json::from_str(&lines[0].1).unwrap();
        assert_eq!(error["message"], "no such widget");
        assert_eq!(error["correlationId"], "abc-123");
        assert!(error["file"]
            .as_str()
            .unwrap()
            .ends_with("integration_tests.rs"));
        assert!(error["line"].is_u64());

        let access: serde_json::Value = serde_json::from_str(&lines[1].1).unwrap();
        assert_eq!(access["message"], "- 404 GET /widgets/9");
        assert_eq!(access["correlationId"], "abc-123");
        assert!(access["duration"].is_u64());
        assert!(access.get("isAccessLog").is_none());

        // Field names stay camelCase across every entry.
        for (_, line) in &lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("processTime").is_some());
            assert!(value.get("process_time").is_none());
        }
    }
}

// ============================================================================
// Tracing Sink Tests
// ============================================================================

mod tracing_sink_tests {
    use super::*;
    use chainlog::message;
    use std::collections::HashMap;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct EventCapture {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    #[derive(Clone, Debug)]
    struct CapturedEvent {
        target: String,
        level: tracing::Level,
        message: String,
    }

    impl EventCapture {
        fn events(&self) -> Vec<CapturedEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl<S> tracing_subscriber::Layer<S> for EventCapture
    where
        S: tracing::Subscriber,
    {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut fields = HashMap::new();
            let mut visitor = FieldVisitor { fields: &mut fields };
            event.record(&mut visitor);

            self.events.lock().unwrap().push(CapturedEvent {
                target: event.metadata().target().to_string(),
                level: *event.metadata().level(),
                message: fields.remove("message").unwrap_or_default(),
            });
        }
    }

    struct FieldVisitor<'a> {
        fields: &'a mut HashMap<String, String>,
    }

    impl<'a> tracing::field::Visit for FieldVisitor<'a> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.fields
                .insert(field.name().to_string(), format!("{:?}", value));
        }

        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    #[test]
    fn default_sink_emits_under_the_chainlog_target() {
        let capture = EventCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let logger = Logger::new();
        logger.warn(None, message!("low disk space"));
        logger.error(None, message!("disk full"));

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.target == "chainlog"));
        assert_eq!(events[0].level, tracing::Level::WARN);
        assert!(events[0].message.contains("low disk space"));
        assert_eq!(events[1].level, tracing::Level::ERROR);
        assert!(events[1].message.contains("ERR: disk full"));
    }
}
