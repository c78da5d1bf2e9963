//! Telegram webhook receiver.

use super::WebhookAck;
use crate::api::{AppState, auth};
use crate::telegram::Update;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

fn rejected(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(WebhookAck {
            ok: false,
            error: Some(error.to_string()),
        }),
    )
        .into_response()
}

/// POST /telegram/webhook - Receive a Telegram update
///
/// Acknowledges every well-formed, authenticated update with `{"ok":true}`,
/// including ones whose handling failed, so Telegram does not redeliver them.
#[utoipa::path(
    post,
    path = "/telegram/webhook",
    tag = "telegram",
    request_body(content = Object, description = "Telegram Bot API update"),
    responses(
        (status = 200, description = "Update accepted", body = WebhookAck),
        (status = 400, description = "Body is not a valid update", body = WebhookAck),
        (status = 401, description = "Secret token missing or wrong", body = WebhookAck)
    )
)]
pub async fn telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !auth::webhook_secret_valid(&state.config.telegram.webhook_secrets, &headers) {
        tracing::warn!("Rejected webhook call with invalid secret token");
        return rejected(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected malformed webhook body");
            return rejected(StatusCode::BAD_REQUEST, "Invalid JSON body");
        }
    };

    let update_id = update.update_id;
    if let Err(e) = state.pipeline.handle_update(update).await {
        tracing::error!(update_id, error = %e, "Failed to handle webhook update");
    }

    Json(WebhookAck {
        ok: true,
        error: None,
    })
    .into_response()
}
