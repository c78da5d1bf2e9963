use super::*;
use crate::pipeline::{EnqueueOutcome, SubmissionRequest};

async fn enqueue(harness: &TestHarness, url: &str) -> i64 {
    let outcome = harness
        .pipeline
        .enqueue_submission(SubmissionRequest {
            chat_id: 1,
            user_id: 10,
            url: Some(url.to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    match outcome {
        EnqueueOutcome::Queued { job_id, .. } => job_id.get(),
        other => panic!("expected Queued, got {:?}", other),
    }
}

#[tokio::test]
async fn test_queue_stats_endpoint() {
    let (app, harness) = create_test_app(|_| {}).await;

    enqueue(&harness, "https://example.com/a").await;
    enqueue(&harness, "https://example.com/b").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/queue/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["pending"], 2);
    assert_eq!(json["claimed"], 0);
    assert_eq!(json["completed"], 0);
    assert_eq!(json["failed"], 0);
}

#[tokio::test]
async fn test_get_job_endpoint() {
    let (app, harness) = create_test_app(|_| {}).await;
    let job_id = enqueue(&harness, "https://example.com/a").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/jobs/{}", job_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], job_id);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["payload"]["url"], "https://example.com/a");
    assert!(json["result"].is_null());

    harness.pipeline.run_worker(None).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/jobs/{}", job_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["result"]["success"], true);
    assert_eq!(json["result"]["outcomes"][0]["slug"], "example-en");
}

#[tokio::test]
async fn test_get_job_not_found() {
    let (app, _harness) = create_test_app(|_| {}).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/jobs/999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "not_found");
}
