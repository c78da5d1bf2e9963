//! Authentication for the REST API
//!
//! Three independent checks:
//! - [`require_api_key`] guards the operational routes with an optional `X-Api-Key`.
//! - [`require_worker_auth`] guards `/worker/run` with the worker secret
//!   (`Authorization: Bearer`, `?token=`) or a trusted scheduler header.
//! - [`webhook_secret_valid`] checks `X-Telegram-Bot-Api-Secret-Token` on the webhook.

use crate::api::AppState;
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Header Telegram sends with the secret configured by `setWebhook`
pub const TELEGRAM_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Authentication middleware that checks for a valid API key in the X-Api-Key header
///
/// Returns 401 when the key is missing or wrong; passes everything through when
/// no key is configured.
pub async fn require_api_key(
    State(expected_api_key): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected_key) = expected_api_key else {
        return next.run(request).await;
    };

    let api_key_header = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    match api_key_header {
        Some(provided_key)
            if constant_time_eq(provided_key.as_bytes(), expected_key.as_bytes()) =>
        {
            next.run(request).await
        }
        Some(_) => unauthorized_response("Invalid API key"),
        None => unauthorized_response("Missing X-Api-Key header"),
    }
}

/// Outcome of the worker trigger authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerAuth {
    /// The caller may run the worker
    Allowed,
    /// Missing or wrong secret
    Unauthorized,
    /// No secret configured while one is required
    NotConfigured,
}

/// Decide whether a worker trigger is authorized
///
/// Order: trusted scheduler header, then the configured secret via Bearer token
/// or `token` query parameter. Without a secret the call is allowed only when
/// `require_secret` is off.
pub fn authorize_worker(
    config: &crate::config::WorkerConfig,
    headers: &HeaderMap,
    query: Option<&str>,
) -> WorkerAuth {
    if let Some(name) = config.trusted_scheduler_header.as_deref() {
        if headers.contains_key(name) {
            return WorkerAuth::Allowed;
        }
    }

    let Some(secret) = config.secret.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return if config.require_secret {
            WorkerAuth::NotConfigured
        } else {
            WorkerAuth::Allowed
        };
    };

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    let query_token = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
    });

    let matches = |candidate: &str| constant_time_eq(candidate.as_bytes(), secret.as_bytes());
    if bearer.is_some_and(matches) || query_token.as_deref().is_some_and(matches) {
        WorkerAuth::Allowed
    } else {
        WorkerAuth::Unauthorized
    }
}

/// Middleware guarding the worker trigger endpoint
pub async fn require_worker_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match authorize_worker(&state.config.worker, request.headers(), request.uri().query()) {
        WorkerAuth::Allowed => next.run(request).await,
        WorkerAuth::Unauthorized => {
            tracing::warn!(path = %request.uri().path(), "Rejected unauthorized worker call");
            unauthorized_response("Unauthorized worker call")
        }
        WorkerAuth::NotConfigured => {
            tracing::error!("Worker call refused: worker secret is not configured");
            let body = Json(json!({
                "error": {
                    "code": "service_unavailable",
                    "message": "Worker secret is not configured"
                }
            }));
            (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
        }
    }
}

/// Check the webhook secret header against the configured secrets
///
/// Any configured secret matches. With no secret configured every request is
/// accepted.
pub fn webhook_secret_valid(secrets: &[String], headers: &HeaderMap) -> bool {
    if secrets.is_empty() {
        tracing::warn!("No webhook secret configured; accepting unauthenticated update");
        return true;
    }

    let Some(received) = headers
        .get(TELEGRAM_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    secrets
        .iter()
        .any(|secret| constant_time_eq(received.as_bytes(), secret.as_bytes()))
}

/// Constant-time byte comparison.
/// Always compares all bytes regardless of where the first mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// 401 Unauthorized with a JSON error body
fn unauthorized_response(message: &str) -> Response {
    let body = Json(json!({
        "error": {
            "code": "unauthorized",
            "message": message
        }
    }));

    (StatusCode::UNAUTHORIZED, body).into_response()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use axum::{
        Router,
        body::Body,
        http::{HeaderValue, Request, StatusCode},
        middleware,
        routing::get,
    };
    use tower::ServiceExt; // for oneshot

    async fn test_handler() -> impl IntoResponse {
        (StatusCode::OK, "Success")
    }

    fn worker_config(secret: Option<&str>) -> WorkerConfig {
        WorkerConfig {
            secret: secret.map(str::to_string),
            ..Default::default()
        }
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[tokio::test]
    async fn test_no_api_key_configured() {
        let app =
            Router::new()
                .route("/test", get(test_handler))
                .layer(middleware::from_fn_with_state(
                    None::<String>,
                    require_api_key,
                ));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_valid_api_key() {
        let api_key = Some("test-secret-key".to_string());

        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn_with_state(api_key, require_api_key));

        let request = Request::builder()
            .uri("/test")
            .header("X-Api-Key", "test-secret-key")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_api_key() {
        let api_key = Some("correct-key".to_string());

        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn_with_state(api_key, require_api_key));

        let request = Request::builder()
            .uri("/test")
            .header("X-Api-Key", "wrong-key")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();
        assert!(body_str.contains("Invalid API key"));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let api_key = Some("required-key".to_string());

        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn_with_state(api_key, require_api_key));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();
        assert!(body_str.contains("Missing X-Api-Key header"));
    }

    #[test]
    fn test_worker_bearer_and_query_token() {
        let config = worker_config(Some("s3cret"));

        assert_eq!(
            authorize_worker(&config, &headers(&[("authorization", "Bearer s3cret")]), None),
            WorkerAuth::Allowed
        );
        assert_eq!(
            authorize_worker(&config, &HeaderMap::new(), Some("limit=3&token=s3cret")),
            WorkerAuth::Allowed
        );
        assert_eq!(
            authorize_worker(&config, &headers(&[("authorization", "Bearer nope")]), None),
            WorkerAuth::Unauthorized
        );
        assert_eq!(
            authorize_worker(&config, &HeaderMap::new(), Some("token=S3CRET")),
            WorkerAuth::Unauthorized
        );
        assert_eq!(
            authorize_worker(&config, &HeaderMap::new(), None),
            WorkerAuth::Unauthorized
        );
    }

    #[test]
    fn test_worker_without_secret() {
        let strict = worker_config(None);
        assert_eq!(
            authorize_worker(&strict, &HeaderMap::new(), None),
            WorkerAuth::NotConfigured
        );

        let relaxed = WorkerConfig {
            require_secret: false,
            ..worker_config(None)
        };
        assert_eq!(
            authorize_worker(&relaxed, &HeaderMap::new(), None),
            WorkerAuth::Allowed
        );
    }

    #[test]
    fn test_worker_trusted_scheduler_header() {
        let config = WorkerConfig {
            trusted_scheduler_header: Some("x-scheduler-cron".to_string()),
            ..worker_config(Some("s3cret"))
        };
        assert_eq!(
            authorize_worker(&config, &headers(&[("x-scheduler-cron", "1")]), None),
            WorkerAuth::Allowed
        );
        // Without the header the secret is still required
        assert_eq!(
            authorize_worker(&config, &HeaderMap::new(), None),
            WorkerAuth::Unauthorized
        );
    }

    #[test]
    fn test_webhook_secret_matching() {
        let secrets = vec!["first".to_string(), "second".to_string()];

        assert!(webhook_secret_valid(
            &secrets,
            &headers(&[(TELEGRAM_SECRET_HEADER, "second")])
        ));
        assert!(!webhook_secret_valid(
            &secrets,
            &headers(&[(TELEGRAM_SECRET_HEADER, "third")])
        ));
        assert!(!webhook_secret_valid(&secrets, &HeaderMap::new()));
        assert!(webhook_secret_valid(&[], &HeaderMap::new()));
    }
}
