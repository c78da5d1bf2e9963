use super::*;
use crate::pipeline::SubmissionRequest;

fn with_secret(config: &mut Config) {
    config.worker.secret = Some("worker-secret".to_string());
}

async fn enqueue_example(harness: &TestHarness) {
    harness
        .pipeline
        .enqueue_submission(SubmissionRequest {
            chat_id: 1,
            user_id: 10,
            url: Some("https://example.com/a".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_worker_run_with_bearer_token() {
    let (app, harness) = create_test_app(with_secret).await;
    enqueue_example(&harness).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/worker/run")
                .header("Authorization", "Bearer worker-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["claimed"], 1);
    assert_eq!(json["completed"], 1);
    assert_eq!(json["staleRequeued"], 0);
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_worker_run_with_query_token_and_limit() {
    let (app, harness) = create_test_app(with_secret).await;
    enqueue_example(&harness).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/worker/run?limit=0&token=worker-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // A zero limit is clamped up to one job
    assert_eq!(body_json(response).await["claimed"], 1);
}

#[tokio::test]
async fn test_worker_run_rejects_wrong_secret() {
    let (app, harness) = create_test_app(with_secret).await;
    enqueue_example(&harness).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/worker/run?token=guess")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.pipeline.db.queue_stats().await.unwrap().pending, 1);
}

#[tokio::test]
async fn test_worker_run_refused_without_configured_secret() {
    let (app, _harness) = create_test_app(|config| {
        config.worker.secret = None;
        config.worker.require_secret = true;
    })
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/worker/run")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_worker_run_allowed_by_trusted_header() {
    let (app, _harness) = create_test_app(|config| {
        with_secret(config);
        config.worker.trusted_scheduler_header = Some("x-scheduler-cron".to_string());
    })
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/worker/run")
                .header("x-scheduler-cron", "1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["claimed"], 0);
}
