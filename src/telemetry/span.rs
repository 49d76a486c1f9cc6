//! Span data model: identifiers, attributes, events, status.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use rand::Rng;
use serde::{Serialize, Serializer};

/// 128-bit trace identifier, shared by every span in one request's tree.
///
/// Rendered as 32 lowercase hex digits. The all-zero value is reserved as
/// the "no active trace" sentinel and is never assigned to a live trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(u128);

impl TraceId {
    pub const ZERO: TraceId = TraceId(0);

    /// Generate a random, nonzero trace id.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let value = rng.gen::<u128>();
            if value != 0 {
                return TraceId(value);
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 64-bit span identifier, unique per span.
///
/// Rendered as 16 lowercase hex digits; all-zero is the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    pub const ZERO: SpanId = SpanId(0);

    /// Generate a random, nonzero span id.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let value = rng.gen::<u64>();
            if value != 0 {
                return SpanId(value);
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for SpanId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The identity of an active span, as seen by log correlation and by child
/// spans resolving their parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
}

/// Scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// Span completion status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    Unset,
    Ok,
    Error { message: String },
}

/// A timestamped event attached to a span.
#[derive(Debug, Clone, Serialize)]
pub struct SpanEvent {
    pub name: String,
    #[serde(serialize_with = "serialize_time")]
    pub timestamp: SystemTime,
    pub attributes: Vec<(String, AttrValue)>,
}

/// One unit of traced work.
///
/// Owned by exactly one [`ScopedSpan`](crate::telemetry::ScopedSpan) at a
/// time; the parent relationship is fixed at creation. Mutation after
/// `finish` is prevented structurally (the owning handle drops the record).
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    #[serde(serialize_with = "serialize_time")]
    pub start: SystemTime,
    #[serde(serialize_with = "serialize_opt_time")]
    pub end: Option<SystemTime>,
    pub attributes: BTreeMap<String, AttrValue>,
    pub events: Vec<SpanEvent>,
    pub status: SpanStatus,
}

impl SpanRecord {
    pub fn new(name: impl Into<String>, trace_id: TraceId, parent_span_id: Option<SpanId>) -> Self {
        Self {
            trace_id,
            span_id: SpanId::generate(),
            parent_span_id,
            name: name.into(),
            start: SystemTime::now(),
            end: None,
            attributes: BTreeMap::new(),
            events: Vec::new(),
            status: SpanStatus::Unset,
        }
    }

    pub fn context(&self) -> SpanContext {
        SpanContext {
            trace_id: self.trace_id,
            span_id: self.span_id,
        }
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn add_event(&mut self, name: impl Into<String>, attributes: Vec<(String, AttrValue)>) {
        self.events.push(SpanEvent {
            name: name.into(),
            timestamp: SystemTime::now(),
            attributes,
        });
    }

    /// Mark the span failed and append an `exception` event carrying the
    /// error's type and message.
    pub fn record_exception<E: std::error::Error>(&mut self, err: &E) {
        let message = err.to_string();
        self.add_event(
            "exception",
            vec![
                (
                    "exception.type".to_string(),
                    AttrValue::Str(std::any::type_name::<E>().to_string()),
                ),
                (
                    "exception.message".to_string(),
                    AttrValue::Str(message.clone()),
                ),
            ],
        );
        self.status = SpanStatus::Error { message };
    }

    pub fn set_status(&mut self, status: SpanStatus) {
        self.status = status;
    }

    /// Set the end timestamp. Only the first call has any effect.
    pub fn finish(&mut self) {
        if self.end.is_none() {
            self.end = Some(SystemTime::now());
        }
    }
}

fn serialize_time<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    let datetime: chrono::DateTime<chrono::Utc> = (*time).into();
    serializer.collect_str(&datetime.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
}

fn serialize_opt_time<S: Serializer>(
    time: &Option<SystemTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match time {
        Some(t) => serialize_time(t, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_rendering_is_fixed_width_hex() {
        assert_eq!(TraceId::ZERO.to_string(), "0".repeat(32));
        assert_eq!(SpanId::ZERO.to_string(), "0".repeat(16));

        let trace_id = TraceId::generate();
        let span_id = SpanId::generate();
        assert_eq!(trace_id.to_string().len(), 32);
        assert_eq!(span_id.to_string().len(), 16);
        assert!(!trace_id.is_zero());
        assert!(!span_id.is_zero());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = SpanId::generate();
        let b = SpanId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_exception_sets_status_and_event() {
        let mut record = SpanRecord::new("op", TraceId::generate(), None);
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        record.record_exception(&err);

        assert_eq!(
            record.status,
            SpanStatus::Error {
                message: "boom".to_string()
            }
        );
        assert_eq!(record.events.len(), 1);
        assert_eq!(record.events[0].name, "exception");
        assert!(record.events[0]
            .attributes
            .contains(&("exception.message".to_string(), AttrValue::Str("boom".to_string()))));
        let (key, AttrValue::Str(type_name)) = &record.events[0].attributes[0] else {
            panic!("missing exception.type attribute");
        };
        assert_eq!(key, "exception.type");
        assert!(type_name.contains("Error"));
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut record = SpanRecord::new("op", TraceId::generate(), None);
        record.finish();
        let first = record.end;
        record.finish();
        assert_eq!(record.end, first);
    }

    #[test]
    fn test_span_record_serializes_hex_ids() {
        let record = SpanRecord::new("op", TraceId::ZERO, None);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["trace_id"], serde_json::json!("0".repeat(32)));
        assert_eq!(value["name"], serde_json::json!("op"));
        assert!(value["end"].is_null());
    }
}
