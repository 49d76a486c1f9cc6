//! Span creation and current-span propagation.
//!
//! # Data Flow
//! ```text
//! middleware ──▶ Tracer::scope          (fresh stack for the request task)
//!     handler ──▶ Tracer::start_span    (push context, return owning guard)
//!         nested work ──▶ start_span    (parent = top of stack)
//!     guard drop ──▶ finish + pop + hand record to the export sink
//! ```
//!
//! The current-span stack is a tokio task local, so two concurrent requests
//! never observe each other's state. Guards close their span on every exit
//! path, including unwind, and a failed pop (scope already torn down) is
//! ignored rather than propagated: observability calls are best-effort.

use std::cell::RefCell;
use std::future::Future;

use tokio::sync::mpsc;

use crate::telemetry::span::{AttrValue, SpanContext, SpanRecord, SpanStatus, TraceId};

tokio::task_local! {
    static SPAN_STACK: RefCell<Vec<SpanContext>>;
}

/// The span currently active for this execution context, if any.
///
/// Read-only: never creates a span. Returns `None` outside any request
/// scope, which log correlation maps to the zero-sentinel identifiers.
pub fn current_span() -> Option<SpanContext> {
    SPAN_STACK
        .try_with(|stack| stack.borrow().last().copied())
        .ok()
        .flatten()
}

/// Creates spans and hands the finished records to the export sink.
///
/// Cheap to clone; handlers receive it through the shared application state
/// rather than a process-global.
#[derive(Clone)]
pub struct Tracer {
    sink: Option<mpsc::Sender<SpanRecord>>,
}

impl Tracer {
    pub fn new(sink: mpsc::Sender<SpanRecord>) -> Self {
        Self { sink: Some(sink) }
    }

    /// A tracer that finishes spans without exporting them.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Establish a fresh current-span stack for one request's execution.
    ///
    /// Called once per request by the instrumentation middleware; everything
    /// awaited inside inherits the stack.
    pub fn scope<F: Future>(&self, fut: F) -> impl Future<Output = F::Output> {
        SPAN_STACK.scope(RefCell::new(Vec::new()), fut)
    }

    /// Start a new span and make it current for the enclosing scope.
    ///
    /// The trace id is inherited from the current span when one exists,
    /// otherwise freshly generated; the current span, if any, becomes the
    /// parent. Never fails.
    pub fn start_span(&self, name: impl Into<String>) -> ScopedSpan {
        let parent = current_span();
        let trace_id = parent.map(|p| p.trace_id).unwrap_or_else(TraceId::generate);
        let record = SpanRecord::new(name, trace_id, parent.map(|p| p.span_id));
        let context = record.context();

        let registered = SPAN_STACK
            .try_with(|stack| stack.borrow_mut().push(context))
            .is_ok();

        ScopedSpan {
            record: Some(record),
            context,
            sink: self.sink.clone(),
            registered,
        }
    }
}

/// Owning handle for an open span.
///
/// Dropping the handle closes the span and restores the previous current
/// span, on every exit path. Mutations after [`end`](ScopedSpan::end) are
/// silent no-ops.
pub struct ScopedSpan {
    record: Option<SpanRecord>,
    context: SpanContext,
    sink: Option<mpsc::Sender<SpanRecord>>,
    registered: bool,
}

impl ScopedSpan {
    pub fn context(&self) -> SpanContext {
        self.context
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        if let Some(record) = self.record.as_mut() {
            record.set_attribute(key, value);
        }
    }

    pub fn add_event(&mut self, name: impl Into<String>, attributes: Vec<(String, AttrValue)>) {
        if let Some(record) = self.record.as_mut() {
            record.add_event(name, attributes);
        }
    }

    pub fn record_exception<E: std::error::Error>(&mut self, err: &E) {
        if let Some(record) = self.record.as_mut() {
            record.record_exception(err);
        }
    }

    pub fn set_status(&mut self, status: SpanStatus) {
        if let Some(record) = self.record.as_mut() {
            record.set_status(status);
        }
    }

    /// Close the span early. Subsequent mutations are no-ops.
    pub fn end(&mut self) {
        self.close();
    }

    fn close(&mut self) {
        let Some(mut record) = self.record.take() else {
            return;
        };
        record.finish();

        if self.registered {
            // The scope may already be gone when the whole task is torn
            // down; a failed pop is irrelevant at that point.
            let _ = SPAN_STACK.try_with(|stack| {
                let mut stack = stack.borrow_mut();
                if let Some(pos) = stack.iter().rposition(|c| c.span_id == self.context.span_id) {
                    stack.remove(pos);
                }
            });
            self.registered = false;
        }

        if let Some(sink) = &self.sink {
            // Non-blocking: a full or closed queue drops the span.
            let _ = sink.try_send(record);
        }
    }
}

impl Drop for ScopedSpan {
    fn drop(&mut self) {
        self.close();
    }
}
