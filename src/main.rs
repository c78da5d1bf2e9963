//! submission-pipeline server
//!
//! Serves the webhook and worker trigger, and runs the internal scheduler until
//! SIGTERM/SIGINT.
//!
//! Usage: `submission-pipeline [config.json]`. Secrets come from the environment
//! (a `.env` file is loaded first).

use std::path::PathBuf;

use submission_pipeline::{Config, Pipeline, Result, run_with_shutdown};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,submission_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let mut config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration");
            Config::from_file(&path)?
        }
        None => Config::default(),
    };
    config.apply_env()?;
    config.validate()?;

    if config.telegram.bot_token.is_none() {
        tracing::warn!("TELEGRAM_BOT_TOKEN is not set; chat notifications are disabled");
    }
    if config.worker.secret.is_none() && config.worker.require_secret {
        tracing::warn!("Worker secret is not set; /worker/run will answer 503");
    }

    let pipeline = Pipeline::new(config).await?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %pipeline.get_config().persistence.database_path.display(),
        "Starting submission pipeline"
    );

    let api = pipeline.spawn_api_server();
    run_with_shutdown(&pipeline).await;

    api.abort();
    pipeline.db.pool().close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
