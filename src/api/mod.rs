//! HTTP server module
//!
//! Hosts the Telegram webhook, the worker trigger, and an OpenAPI 3.1 documented
//! set of queue inspection endpoints.

use crate::{Config, Pipeline, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Telegram
/// - `POST /telegram/webhook` - Receive updates (checked against the webhook secret)
///
/// ## Worker
/// - `GET|POST /worker/run?limit=N` - Process queued jobs (worker secret or trusted header)
///
/// ## Operations (behind the optional `X-Api-Key`)
/// - `GET /queue/stats` - Job counts per status
/// - `GET /jobs/:id` - Single job with payload and result
/// - `GET /events` - Server-sent events stream
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
///
/// ## Unauthenticated
/// - `GET /health` - Health check
pub fn create_router(pipeline: Arc<Pipeline>, config: Arc<Config>) -> Router {
    let state = AppState::new(pipeline, config.clone());

    let webhook = Router::new().route("/telegram/webhook", post(routes::telegram_webhook));

    let worker = Router::new()
        .route(
            "/worker/run",
            get(routes::run_worker).post(routes::run_worker),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_worker_auth,
        ));

    let ops = Router::new()
        .route("/queue/stats", get(routes::queue_stats))
        .route("/jobs/:id", get(routes::get_job))
        .route("/events", get(routes::event_stream))
        .route("/openapi.json", get(routes::openapi_spec));

    // Swagger UI reuses the /openapi.json document
    let ops = if config.server.api.swagger_ui {
        ops.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()))
    } else {
        ops
    };

    let ops = if config.server.api.api_key.is_some() {
        ops.route_layer(middleware::from_fn_with_state(
            config.server.api.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        ops
    };

    let router = Router::new()
        .route("/health", get(routes::health_check))
        .merge(webhook)
        .merge(worker)
        .merge(ops)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops.
///
/// # Example
///
/// ```no_run
/// use submission_pipeline::{Config, Pipeline};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let pipeline = Arc::new(Pipeline::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// submission_pipeline::api::start_api_server(pipeline, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(pipeline: Arc<Pipeline>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(pipeline, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
