//! Core pipeline implementation split into focused submodules.
//!
//! The `Pipeline` struct and its methods are organized by domain:
//! - [`intake`] - Validation, duplicate lookup, and enqueueing of new submissions
//! - [`worker`] - Lease-based batch runner invoked by a scheduler tick
//! - [`processor`] - Ordered stages of one submission job
//! - [`images`] - Image placement inside article bodies
//! - [`messages`] - Localized chat texts
//! - [`scheduler`] - Internal worker ticker and housekeeping

mod images;
mod intake;
pub mod messages;
mod processor;
mod scheduler;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use intake::{EnqueueOutcome, SubmissionRequest};
pub use scheduler::HousekeepingReport;

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::notifier::{InlineKeyboard, NoOpNotifier, Notifier, TelegramNotifier};
use crate::services::{
    ContentExtractor, HtmlExtractor, HttpImageProvider, ImageProvider, NoOpImageProvider,
    OpenAiTextGenerator, TextGenerator, UnconfiguredTextGenerator,
};
use crate::types::Event;
use std::sync::Arc;

/// External collaborators used by the processor and the webhook flow
#[derive(Clone)]
pub struct Collaborators {
    /// Source page extraction
    pub extractor: Arc<dyn ContentExtractor>,
    /// Rewrites and translations
    pub generator: Arc<dyn TextGenerator>,
    /// Article images
    pub images: Arc<dyn ImageProvider>,
    /// Chat messages
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    /// Build the default collaborators for a configuration
    ///
    /// Missing credentials select the inert implementations: no OpenAI key gives
    /// [`UnconfiguredTextGenerator`], no image endpoint gives [`NoOpImageProvider`],
    /// and no bot token gives [`NoOpNotifier`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let extractor: Arc<dyn ContentExtractor> = Arc::new(HtmlExtractor::new(&config.services)?);

        let generator: Arc<dyn TextGenerator> = if config.services.openai_api_key.is_some() {
            Arc::new(OpenAiTextGenerator::new(&config.services)?)
        } else {
            Arc::new(UnconfiguredTextGenerator)
        };

        let images: Arc<dyn ImageProvider> = match &config.services.image_endpoint {
            Some(endpoint) => Arc::new(HttpImageProvider::new(
                endpoint.clone(),
                config.services.image_timeout,
            )?),
            None => Arc::new(NoOpImageProvider),
        };

        let notifier: Arc<dyn Notifier> = if config.telegram.bot_token.is_some() {
            Arc::new(TelegramNotifier::new(
                &config.telegram,
                config.retry.clone(),
            )?)
        } else {
            Arc::new(NoOpNotifier)
        };

        tracing::info!(
            extractor = extractor.name(),
            generator = generator.name(),
            images = images.name(),
            notifier = notifier.name(),
            "Collaborators initialized"
        );

        Ok(Self {
            extractor,
            generator,
            images,
            notifier,
        })
    }
}

/// Main pipeline instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Pipeline {
    /// Database instance for persistence (wrapped in Arc for sharing across tasks)
    /// Public for integration tests to inspect queue and article state
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Extraction, generation, image and chat collaborators
    pub(crate) services: Collaborators,
}

impl Pipeline {
    /// Create a pipeline with the default collaborators for `config`
    ///
    /// Opens (or creates) the SQLite database and runs migrations.
    pub async fn new(config: Config) -> Result<Self> {
        let services = Collaborators::from_config(&config)?;
        let db = Database::new(&config.persistence.database_path).await?;
        Ok(Self::with_collaborators(config, db, services))
    }

    /// Create a pipeline from an open database and explicit collaborators
    pub fn with_collaborators(config: Config, db: Database, services: Collaborators) -> Self {
        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Self {
            db: Arc::new(db),
            event_tx,
            config: Arc::new(config),
            services,
        }
    }

    /// Subscribe to pipeline events
    ///
    /// Each subscriber receives all events independently. A subscriber that falls
    /// behind by more than 1000 events receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers; dropped when nobody listens
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Send a chat message, logging instead of failing
    pub(crate) async fn notify(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Option<i64> {
        match self
            .services
            .notifier
            .send_message(chat_id, text, keyboard)
            .await
        {
            Ok(message_id) => message_id,
            Err(e) => {
                self.notification_failed(chat_id, &e);
                None
            }
        }
    }

    /// Edit a message (or send a new one), logging instead of failing
    pub(crate) async fn notify_update(
        &self,
        chat_id: i64,
        message_id: Option<i64>,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Option<i64> {
        match self
            .services
            .notifier
            .edit_or_send(chat_id, message_id, text, keyboard)
            .await
        {
            Ok(message_id) => message_id,
            Err(e) => {
                self.notification_failed(chat_id, &e);
                None
            }
        }
    }

    fn notification_failed(&self, chat_id: i64, error: &crate::Error) {
        tracing::warn!(
            chat_id,
            notifier = self.services.notifier.name(),
            error = %error,
            "Notification failed"
        );
        self.emit_event(Event::NotificationFailed {
            chat_id,
            error: error.to_string(),
        });
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let pipeline = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(Arc::new(pipeline), config).await })
    }
}
