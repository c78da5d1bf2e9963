//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the submission-pipeline HTTP API using
//! utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the submission-pipeline HTTP API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "submission-pipeline API",
        version = "0.1.0",
        description = "Telegram webhook, worker trigger, and queue inspection for the content submission pipeline",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8787", description = "Local development server")
    ),
    paths(
        // Telegram
        crate::api::routes::telegram_webhook,

        // Worker
        crate::api::routes::run_worker,

        // Queue
        crate::api::routes::queue_stats,
        crate::api::routes::get_job,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::SubmissionId,
        crate::types::JobStatus,
        crate::types::Language,
        crate::types::InterfaceLanguage,
        crate::types::ContentStyle,
        crate::types::ImageSource,
        crate::types::ImageOptions,
        crate::types::SubmissionPayload,
        crate::types::Stage,
        crate::types::StageRecord,
        crate::types::LanguageOutcome,
        crate::types::SubmissionResult,
        crate::types::WorkerSummary,
        crate::types::QueueStats,
        crate::types::Event,

        // API request/response types from routes
        crate::api::routes::WorkerRunResponse,
        crate::api::routes::WebhookAck,
        crate::api::routes::JobResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
        crate::error::ErrorCategory,
    )),
    tags(
        (name = "telegram", description = "Telegram webhook - Drafts, settings commands, and submissions"),
        (name = "worker", description = "Worker trigger - Process queued submission jobs"),
        (name = "queue", description = "Queue inspection - Statistics and job details"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon adding the API key and worker bearer schemes
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme};

        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Api-Key"))),
            );
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
