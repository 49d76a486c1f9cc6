//! End-to-end trace structure: one request produces one trace tree with
//! correct parent linkage, and every span closes exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use beacon::telemetry::{SpanRecord, SpanStatus, Tracer};
use beacon::workload::FixedPolicy;

mod common;

async fn next_span(rx: &mut mpsc::Receiver<SpanRecord>) -> SpanRecord {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("span not exported in time")
        .expect("span channel closed")
}

#[tokio::test]
async fn test_request_produces_linked_span_tree() {
    let downstream = common::start_mock_downstream(200, "ok").await;
    let mut config = common::test_config();
    config.downstream.url = format!("http://{downstream}/");

    let (span_tx, mut span_rx) = mpsc::channel(64);
    let (addr, shutdown) = common::spawn_app_with_tracer(
        config,
        Arc::new(FixedPolicy::instant()),
        Tracer::new(span_tx),
    )
    .await;

    let client = common::test_client();
    let res = client
        .get(format!("http://{addr}/api/data"))
        .send()
        .await
        .expect("service unreachable");
    assert_eq!(res.status(), 200);

    // Spans arrive in closing order: leaves first, root last.
    let database = next_span(&mut span_rx).await;
    let downstream_call = next_span(&mut span_rx).await;
    let data_operation = next_span(&mut span_rx).await;
    let root = next_span(&mut span_rx).await;

    assert_eq!(database.name, "database-query");
    assert_eq!(downstream_call.name, "downstream-call");
    assert_eq!(data_operation.name, "data-operation");
    assert_eq!(root.name, "GET /api/data");

    // One trace for the whole request.
    for span in [&database, &downstream_call, &data_operation] {
        assert_eq!(span.trace_id, root.trace_id);
    }

    // Distinct span ids, correct parent linkage.
    assert_eq!(root.parent_span_id, None);
    assert_eq!(data_operation.parent_span_id, Some(root.span_id));
    assert_eq!(database.parent_span_id, Some(data_operation.span_id));
    assert_eq!(downstream_call.parent_span_id, Some(data_operation.span_id));
    assert_ne!(database.span_id, downstream_call.span_id);

    // Every span closed, none marked failed.
    for span in [&database, &downstream_call, &data_operation, &root] {
        assert!(span.end.is_some(), "span {} left open", span.name);
        assert_eq!(span.status, SpanStatus::Unset);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_failed_request_closes_and_marks_root() {
    let mut config = common::test_config();
    config.downstream.url = common::unreachable_url();
    config.downstream.timeout_ms = 300;

    let (span_tx, mut span_rx) = mpsc::channel(64);
    let (addr, shutdown) = common::spawn_app_with_tracer(
        config,
        Arc::new(FixedPolicy::instant()),
        Tracer::new(span_tx),
    )
    .await;

    let client = common::test_client();
    let res = client
        .get(format!("http://{addr}/api/data"))
        .send()
        .await
        .expect("service unreachable");
    assert_eq!(res.status(), 503);

    let database = next_span(&mut span_rx).await;
    let downstream_call = next_span(&mut span_rx).await;
    let data_operation = next_span(&mut span_rx).await;
    let root = next_span(&mut span_rx).await;

    assert_eq!(database.status, SpanStatus::Unset);
    assert!(matches!(downstream_call.status, SpanStatus::Error { .. }));
    assert!(matches!(root.status, SpanStatus::Error { .. }));

    // The error path still closes every span exactly once.
    for span in [&database, &downstream_call, &data_operation, &root] {
        assert!(span.end.is_some(), "span {} left open", span.name);
    }
    assert_eq!(
        root.attributes.get("http.status_code"),
        Some(&beacon::telemetry::AttrValue::Int(503))
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_two_requests_get_distinct_traces() {
    let (span_tx, mut span_rx) = mpsc::channel(64);
    let (addr, shutdown) = common::spawn_app_with_tracer(
        common::test_config(),
        Arc::new(FixedPolicy::instant()),
        Tracer::new(span_tx),
    )
    .await;

    let client = common::test_client();
    for _ in 0..2 {
        let res = client
            .get(format!("http://{addr}/health"))
            .send()
            .await
            .expect("service unreachable");
        assert_eq!(res.status(), 200);
    }

    // Each request yields a health-check span and its root.
    let first_health = next_span(&mut span_rx).await;
    let first_root = next_span(&mut span_rx).await;
    let second_health = next_span(&mut span_rx).await;
    let second_root = next_span(&mut span_rx).await;

    assert_eq!(first_health.trace_id, first_root.trace_id);
    assert_eq!(second_health.trace_id, second_root.trace_id);
    assert_ne!(first_root.trace_id, second_root.trace_id);

    shutdown.trigger();
}
