//! # submission-pipeline
//!
//! Durable pipeline turning chat submissions (links or article text sent to a
//! Telegram bot) into published multi-language articles.
//!
//! ## Design
//!
//! - **Durable queue** - Submissions become jobs in SQLite, claimed under a lease
//!   and recycled when a worker disappears mid-job
//! - **Stateless workers** - Any trigger (HTTP call, internal ticker, enqueue) runs
//!   a bounded batch; all coordination goes through the queue
//! - **Typed stages** - resolve, dedupe, transform, translate, images, identify,
//!   persist, notify
//! - **Event-driven** - Consumers subscribe to lifecycle events
//!
//! ## Quick Start
//!
//! ```no_run
//! use submission_pipeline::{Config, Pipeline, SubmissionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::new(Config::default()).await?;
//!
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     pipeline
//!         .enqueue_submission(SubmissionRequest {
//!             chat_id: 1,
//!             user_id: 1,
//!             url: Some("https://example.com/story".to_string()),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     let summary = pipeline.run_worker(None).await?;
//!     println!("completed {} jobs", summary.completed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP API: webhook, worker trigger, queue inspection
pub mod api;
/// Configuration types
pub mod config;
/// Text normalization, categories, excerpts
pub mod content;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Chat notifications
pub mod notifier;
/// Queue worker and submission processor (decomposed into focused submodules)
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// External collaborators: extraction, text generation, images
pub mod services;
/// Article slugs
pub mod slug;
/// Telegram webhook receiver
pub mod telegram;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorCategory, ErrorDetail, Result, ToHttpStatus};
pub use notifier::{InlineButton, InlineKeyboard, Notifier};
pub use pipeline::{Collaborators, EnqueueOutcome, HousekeepingReport, Pipeline, SubmissionRequest};
pub use services::{ContentExtractor, ImageProvider, TextGenerator};
pub use types::{
    ChatSettings, ContentStyle, Event, ImageSource, InterfaceLanguage, JobId, JobStatus,
    Language, QueueStats, Stage, SubmissionId, SubmissionPayload, SubmissionResult,
    WorkerSummary,
};

/// Run the pipeline's background tasks until a termination signal arrives.
///
/// Starts the internal scheduler (worker ticks and housekeeping), waits for a
/// signal, then cancels the tasks and waits for them to finish.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use submission_pipeline::{Config, Pipeline, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = Pipeline::new(Config::default()).await?;
///     let _api = pipeline.spawn_api_server();
///
///     run_with_shutdown(&pipeline).await;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(pipeline: &Pipeline) {
    let cancel = tokio_util::sync::CancellationToken::new();
    let handles = pipeline.start_background_tasks(cancel.clone());

    wait_for_signal().await;

    tracing::info!("Shutting down background tasks");
    cancel.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Background task ended abnormally");
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
