use super::*;
use crate::Config;
use crate::pipeline::test_helpers::*;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use std::time::Duration;
use tower::ServiceExt;

mod queue;
mod worker;

/// Router over a test pipeline; `configure` adjusts the config the router sees
async fn create_test_app(configure: impl FnOnce(&mut Config)) -> (Router, TestHarness) {
    let harness = create_test_pipeline().await;
    let mut config = (*harness.pipeline.get_config()).clone();
    configure(&mut config);
    let app = create_router(Arc::new(harness.pipeline.clone()), Arc::new(config));
    (app, harness)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let harness = create_test_pipeline().await;

    let mut config = (*harness.pipeline.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let pipeline = Arc::new(harness.pipeline.clone());
        let config = config.clone();
        async move { start_api_server(pipeline, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be running");
    api_handle.abort();
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _harness) = create_test_app(|_| {}).await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (app, _harness) = create_test_app(|config| {
        config.server.api.cors_enabled = true;
        config.server.api.cors_origins = vec!["*".to_string()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_api_key_guards_operational_routes_only() {
    let (app, _harness) = create_test_app(|config| {
        config.server.api.api_key = Some("ops-key".to_string());
    })
    .await;

    // Operational route without the key
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/queue/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // With the key
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/queue/stats")
                .header("X-Api-Key", "ops-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Health and the webhook stay reachable without the key
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/telegram/webhook")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"update_id": 1}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_swagger_ui_enabled() {
    let (app, _harness) = create_test_app(|config| {
        config.server.api.swagger_ui = true;
    })
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/swagger-ui/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_swagger_ui_disabled() {
    let (app, _harness) = create_test_app(|config| {
        config.server.api.swagger_ui = false;
    })
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/swagger-ui/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
