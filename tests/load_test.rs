//! Load-test endpoint behavior and concurrent traffic handling.

use std::sync::Arc;

use serde_json::Value;

use beacon::workload::FixedPolicy;

mod common;

#[tokio::test]
async fn test_load_test_reports_every_call() {
    let downstream = common::start_mock_downstream(200, "ok").await;
    let mut config = common::test_config();
    config.downstream.url = format!("http://{downstream}/");
    config.load_test.calls = 5;

    let (addr, shutdown) = common::spawn_app(config, Arc::new(FixedPolicy::instant())).await;
    let client = common::test_client();

    let res = client
        .get(format!("http://{addr}/load-test"))
        .send()
        .await
        .expect("service unreachable");
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["calls"], serde_json::json!(5));
    assert_eq!(body["succeeded"], serde_json::json!(5));
    assert_eq!(body["failed"], serde_json::json!(0));

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result["call"], serde_json::json!(i + 1));
        assert_eq!(result["ok"], serde_json::json!(true));
        assert_eq!(result["status"], serde_json::json!(200));
        assert!(result["error"].is_null());
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_requests_all_complete() {
    let (addr, shutdown) =
        common::spawn_app(common::test_config(), Arc::new(FixedPolicy::instant())).await;

    let concurrency = 16;
    let requests_per_task = 10;
    let client = common::test_client();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{addr}/health");
        tasks.push(tokio::spawn(async move {
            let mut ok = 0;
            for _ in 0..requests_per_task {
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() {
                        ok += 1;
                    }
                }
            }
            ok
        }));
    }

    let mut total_ok = 0;
    for task in tasks {
        total_ok += task.await.unwrap();
    }
    assert_eq!(total_ok, concurrency * requests_per_task);

    shutdown.trigger();
}
