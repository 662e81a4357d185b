//! HTTP surface tests against a real server bound to an ephemeral port.

mod common;

use common::{header, open_item, TestStack};
use recon_core::web::{self, state::AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn start_server(stack: &TestStack) -> String {
    let app = web::router(AppState {
        queue: Arc::clone(&stack.queue),
        tasks: Arc::clone(&stack.tasks),
        tracker: Arc::clone(&stack.tracker),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server runs");
    });
    format!("http://{addr}")
}

async fn wait_for_state(client: &reqwest::Client, base: &str, task_id: &str, state: &str) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let task: Value = client
            .get(format!("{base}/api/tasks/{task_id}"))
            .send()
            .await
            .expect("get task")
            .json()
            .await
            .expect("task json");
        if task["lifecycle_state"] == state {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task never reached {state}, last seen {}",
            task["lifecycle_state"]
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_submit_and_auto_complete_over_http() {
    let stack = TestStack::start(vec![open_item("LED-101", "12345678", "INV-888", 14_200)]);
    stack.put_document("doc/a.json", &header("12345678", "INV-888", 14_200));
    let base = start_server(&stack).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/jobs"))
        .json(&json!({"document_ref": "doc/a.json", "priority": "HIGH"}))
        .send()
        .await
        .expect("submit job");
    assert_eq!(response.status(), 202);
    let body: Value = response.json().await.expect("submit body");
    let task_id = body["task_id"].as_str().expect("task_id").to_string();
    let job_id = body["job_id"].as_str().expect("job_id").to_string();

    let task = wait_for_state(&client, &base, &task_id, "COMPLETED").await;
    assert_eq!(task["match_result"]["status"], "GREEN");
    assert_eq!(task["match_result"]["matched_item_ref"], "LED-101");

    let job: Value = client
        .get(format!("{base}/api/jobs/{job_id}"))
        .send()
        .await
        .expect("get job")
        .json()
        .await
        .expect("job json");
    assert_eq!(job["status"], "COMPLETED");
    assert_eq!(job["priority"], "HIGH");

    stack.pool.shutdown().await;
}

#[tokio::test]
async fn test_review_decision_enforces_versioning() {
    let stack = TestStack::start(vec![open_item("LED-101", "12345678", "INV-0888", 14_200)]);
    stack.put_document("doc/b.json", &header("12345678", "INV-888", 14_205));
    let base = start_server(&stack).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{base}/api/jobs"))
        .json(&json!({"document_ref": "doc/b.json"}))
        .send()
        .await
        .expect("submit job")
        .json()
        .await
        .expect("submit body");
    let task_id = body["task_id"].as_str().expect("task_id").to_string();

    let task = wait_for_state(&client, &base, &task_id, "PENDING_REVIEW").await;
    assert_eq!(task["match_result"]["status"], "YELLOW");
    let version = task["version"].as_u64().expect("version");

    // The review queue lists it by default.
    let pending: Value = client
        .get(format!("{base}/api/tasks"))
        .send()
        .await
        .expect("list tasks")
        .json()
        .await
        .expect("tasks json");
    assert!(pending
        .as_array()
        .expect("array")
        .iter()
        .any(|t| t["task_id"] == task_id.as_str()));

    // Stale version: rejected without applying anything.
    let stale = client
        .post(format!("{base}/api/tasks/{task_id}/decision"))
        .json(&json!({
            "expected_version": version - 1,
            "action": "approve",
            "selected_match_ref": "LED-101"
        }))
        .send()
        .await
        .expect("stale decision");
    assert_eq!(stale.status(), 409);

    // Approve without naming an item: confirms the engine's candidate.
    let approved = client
        .post(format!("{base}/api/tasks/{task_id}/decision"))
        .json(&json!({
            "expected_version": version,
            "action": "approve",
            "notes": "tolerance difference"
        }))
        .send()
        .await
        .expect("decision");
    assert_eq!(approved.status(), 200);
    let resolved: Value = approved.json().await.expect("decision body");
    assert_eq!(resolved["lifecycle_state"], "RESOLVED");
    assert_eq!(resolved["review"]["action"], "approve");
    assert_eq!(resolved["review"]["selected_match_ref"], "LED-101");

    stack.pool.shutdown().await;
}

#[tokio::test]
async fn test_dlq_listing_and_single_resolution() {
    // No stored object: every attempt fails recoverably until the job
    // dead-letters.
    let stack = TestStack::start(vec![]);
    let base = start_server(&stack).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{base}/api/jobs"))
        .json(&json!({"document_ref": "doc/lost.json"}))
        .send()
        .await
        .expect("submit job")
        .json()
        .await
        .expect("submit body");
    let job_id = body["job_id"].as_str().expect("job_id").to_string();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let entries: Vec<Value> = loop {
        let entries: Vec<Value> = client
            .get(format!("{base}/api/dlq"))
            .send()
            .await
            .expect("list dlq")
            .json()
            .await
            .expect("dlq json");
        if !entries.is_empty() {
            break entries;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job never dead-lettered"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["original_job_id"], job_id.as_str());
    let dlq_id = entries[0]["dlq_id"].as_str().expect("dlq_id").to_string();

    let missing = client
        .post(format!("{base}/api/dlq/resolve"))
        .json(&json!({
            "dlq_id": uuid::Uuid::new_v4(),
            "action": "discard"
        }))
        .send()
        .await
        .expect("resolve unknown");
    assert_eq!(missing.status(), 404);

    let discarded = client
        .post(format!("{base}/api/dlq/resolve"))
        .json(&json!({"dlq_id": dlq_id, "action": "discard", "notes": "test doc"}))
        .send()
        .await
        .expect("resolve");
    assert_eq!(discarded.status(), 200);

    let duplicate = client
        .post(format!("{base}/api/dlq/resolve"))
        .json(&json!({"dlq_id": dlq_id, "action": "retry"}))
        .send()
        .await
        .expect("duplicate resolve");
    assert_eq!(duplicate.status(), 409);

    stack.pool.shutdown().await;
}

#[tokio::test]
async fn test_health_and_pipeline_report() {
    let stack = TestStack::start(vec![open_item("LED-101", "12345678", "INV-888", 14_200)]);
    stack.put_document("doc/a.json", &header("12345678", "INV-888", 14_200));
    let base = start_server(&stack).await;
    let client = reqwest::Client::new();

    let health = client
        .get(format!("{base}/health"))
        .send()
        .await
        .expect("health");
    assert_eq!(health.status(), 200);

    let body: Value = client
        .post(format!("{base}/api/jobs"))
        .json(&json!({"document_ref": "doc/a.json"}))
        .send()
        .await
        .expect("submit job")
        .json()
        .await
        .expect("submit body");
    let task_id = body["task_id"].as_str().expect("task_id").to_string();
    wait_for_state(&client, &base, &task_id, "COMPLETED").await;

    let report: Value = client
        .get(format!("{base}/api/pipeline/report?window_seconds=60"))
        .send()
        .await
        .expect("report")
        .json()
        .await
        .expect("report json");
    assert_eq!(report["total_executions"], 1);
    assert_eq!(report["successful_executions"], 1);
    assert_eq!(
        report["stage_breakdown"].as_array().expect("stages").len(),
        4
    );
    assert!(report["bottlenecks"].is_array());

    let stats: Value = client
        .get(format!("{base}/api/queue/stats"))
        .send()
        .await
        .expect("stats")
        .json()
        .await
        .expect("stats json");
    assert_eq!(stats["NORMAL"]["completed"], 1);

    stack.pool.shutdown().await;
}
