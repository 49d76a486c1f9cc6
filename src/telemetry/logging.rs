//! Structured logging with trace correlation.
//!
//! Every log record is one JSON line carrying `trace_id` and `span_id`
//! resolved from the current span at emission time, or fixed zero sentinels
//! when no span is active. Correlation is enrichment only: it never fails
//! the log call and never touches span state.

use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::telemetry::span::{SpanId, TraceId};
use crate::telemetry::tracer::current_span;

/// Layer that renders events as correlated JSON lines.
pub struct CorrelationLayer {
    service: String,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl CorrelationLayer {
    pub fn new(service: impl Into<String>, writer: impl Write + Send + 'static) -> Self {
        Self {
            service: service.into(),
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout(service: impl Into<String>) -> Self {
        Self::new(service, std::io::stdout())
    }
}

impl<S: Subscriber> Layer<S> for CorrelationLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Map::new();
        event.record(&mut JsonVisitor(&mut fields));
        let message = fields
            .remove("message")
            .unwrap_or_else(|| Value::String(String::new()));

        let (trace_id, span_id) = match current_span() {
            Some(ctx) => (ctx.trace_id.to_string(), ctx.span_id.to_string()),
            None => (TraceId::ZERO.to_string(), SpanId::ZERO.to_string()),
        };

        let metadata = event.metadata();
        let mut line = json!({
            "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "level": metadata.level().to_string(),
            "service": self.service,
            "target": metadata.target(),
            "message": message,
            "trace_id": trace_id,
            "span_id": span_id,
        });
        if let Value::Object(object) = &mut line {
            object.append(&mut fields);
        }

        // Log delivery is best-effort: serialization or IO failures are
        // swallowed rather than surfaced to the caller.
        if let Ok(rendered) = serde_json::to_string(&line) {
            if let Ok(mut writer) = self.writer.lock() {
                let _ = writeln!(writer, "{rendered}");
            }
        }
    }
}

struct JsonVisitor<'a>(&'a mut Map<String, Value>);

impl Visit for JsonVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.0
            .insert(field.name().to_string(), value.to_string().into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), format!("{value:?}").into());
    }
}

/// Install the global subscriber: env-filter plus the correlation layer.
pub fn init(service: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{default_level},hyper_util=warn,reqwest=warn"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(CorrelationLayer::stdout(service))
        .init();
}
