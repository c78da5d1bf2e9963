//! Configuration types for submission-pipeline
//!
//! Every field has a serde default so a config file only needs to name what it
//! changes. Secrets are normally supplied through the environment (see
//! [`Config::apply_env`]) rather than written to the file.

use crate::error::{Error, Result};
use crate::types::{ContentStyle, ImageSource, Language};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the submission pipeline
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Job queue leasing, batching, and requeue backoff
    #[serde(default)]
    pub queue: QueueConfig,

    /// In-call retries for short external requests
    #[serde(default)]
    pub retry: RetryConfig,

    /// Worker invocation limits and trigger authentication
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Telegram Bot API integration
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Extraction, text generation, and image collaborators
    #[serde(default)]
    pub services: ServicesConfig,

    /// Pending category selections
    #[serde(default)]
    pub pending: PendingConfig,

    /// Published site and article identity
    #[serde(default)]
    pub site: SiteConfig,

    /// Defaults applied to chats without saved settings
    #[serde(default)]
    pub defaults: SubmissionDefaults,

    /// API server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        Ok(config)
    }

    /// Overlay secrets and deployment settings from environment variables
    ///
    /// Recognized variables: `DATABASE_PATH`, `TELEGRAM_BOT_TOKEN`,
    /// `TELEGRAM_SECRET_TOKEN` / `TELEGRAM_BOT_SECRET`, `WORKER_SECRET` /
    /// `CRON_SECRET`, `OPENAI_API_KEY`, `IMAGE_ENDPOINT`, `SITE_BASE_URL`,
    /// `BIND_ADDRESS`, `API_KEY`.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    pub(crate) fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(path) = lookup("DATABASE_PATH") {
            self.persistence.database_path = PathBuf::from(path);
        }
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        for key in ["TELEGRAM_SECRET_TOKEN", "TELEGRAM_BOT_SECRET"] {
            if let Some(secret) = lookup(key) {
                if !self.telegram.webhook_secrets.contains(&secret) {
                    self.telegram.webhook_secrets.push(secret);
                }
            }
        }
        if let Some(secret) = lookup("WORKER_SECRET").or_else(|| lookup("CRON_SECRET")) {
            self.worker.secret = Some(secret);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.services.openai_api_key = Some(key);
        }
        if let Some(endpoint) = lookup("IMAGE_ENDPOINT") {
            self.services.image_endpoint = Some(endpoint);
        }
        if let Some(base_url) = lookup("SITE_BASE_URL") {
            self.site.base_url = base_url;
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            self.server.api.bind_address = addr
                .parse()
                .map_err(|e| Error::config("server.api.bind_address", format!("{addr}: {e}")))?;
        }
        if let Some(key) = lookup("API_KEY") {
            self.server.api.api_key = Some(key);
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.queue.lease_duration.is_zero() {
            return Err(Error::config(
                "queue.lease_duration",
                "lease duration must be greater than zero",
            ));
        }
        if self.queue.max_attempts == 0 {
            return Err(Error::config(
                "queue.max_attempts",
                "max attempts must be at least 1",
            ));
        }
        if self.queue.default_batch == 0 || self.queue.default_batch > self.queue.max_batch {
            return Err(Error::config(
                "queue.default_batch",
                format!(
                    "default batch must be between 1 and max_batch ({})",
                    self.queue.max_batch
                ),
            ));
        }
        if self.site.target_languages.is_empty() {
            return Err(Error::config(
                "site.target_languages",
                "at least one target language is required",
            ));
        }
        if self.site.slug_max_length < crate::slug::MIN_MAX_LENGTH {
            return Err(Error::config(
                "site.slug_max_length",
                format!(
                    "slug max length must be at least {}",
                    crate::slug::MIN_MAX_LENGTH
                ),
            ));
        }
        if self.pending.sweep_interval.is_zero() {
            return Err(Error::config(
                "pending.sweep_interval",
                "sweep interval must be greater than zero",
            ));
        }
        if self.worker.poll_interval.is_some_and(|i| i.is_zero()) {
            return Err(Error::config(
                "worker.poll_interval",
                "poll interval must be greater than zero when set",
            ));
        }
        if self.defaults.images_count > 3 {
            return Err(Error::config(
                "defaults.images_count",
                "images count must be between 0 and 3",
            ));
        }
        Ok(())
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database path (default: "./submission-pipeline.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Job queue configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    /// How long a claim stays exclusive (default: 300 seconds)
    #[serde(default = "default_lease_duration", with = "duration_serde")]
    pub lease_duration: Duration,

    /// Attempts per job before it is failed permanently (default: 3)
    #[serde(default = "default_job_max_attempts")]
    pub max_attempts: u32,

    /// Jobs claimed per worker run when no limit is given (default: 2)
    #[serde(default = "default_batch")]
    pub default_batch: u32,

    /// Upper bound for the per-run limit (default: 10)
    #[serde(default = "default_max_batch")]
    pub max_batch: u32,

    /// Stale claims inspected per worker run (default: 50)
    #[serde(default = "default_stale_scan_limit")]
    pub stale_scan_limit: u32,

    /// Window in which an identical submission from the same user is refused (default: 900 seconds)
    #[serde(default = "default_dedup_window", with = "duration_serde")]
    pub dedup_window: Duration,

    /// Delay before a failed job can be claimed again
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            lease_duration: default_lease_duration(),
            max_attempts: default_job_max_attempts(),
            default_batch: default_batch(),
            max_batch: default_max_batch(),
            stale_scan_limit: default_stale_scan_limit(),
            dedup_window: default_dedup_window(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Requeue backoff for failed jobs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay after the first failed attempt (default: 30 seconds)
    #[serde(default = "default_backoff_initial", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay (default: 900 seconds)
    #[serde(default = "default_backoff_max", with = "duration_serde")]
    pub max_delay: Duration,

    /// Growth factor per attempt (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_backoff_initial(),
            max_delay: default_backoff_max(),
            multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Retry configuration for transient failures of short calls
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Worker invocation configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Shared secret for the trigger endpoint (Bearer token or `?token=`)
    #[serde(default)]
    pub secret: Option<String>,

    /// Header whose presence marks a request from the platform scheduler
    ///
    /// Only set this when the hosting platform strips the header from external traffic.
    #[serde(default)]
    pub trusted_scheduler_header: Option<String>,

    /// Refuse triggers with 503 when no secret is configured (default: true)
    #[serde(default = "default_true")]
    pub require_secret: bool,

    /// Wall-clock budget for one worker run (default: 240 seconds)
    #[serde(default = "default_time_budget", with = "duration_serde")]
    pub time_budget: Duration,

    /// Upper bound for processing one job (default: 120 seconds)
    #[serde(default = "default_job_timeout", with = "duration_serde")]
    pub job_timeout: Duration,

    /// Run the worker from an internal ticker at this interval
    #[serde(default, with = "optional_duration_serde")]
    pub poll_interval: Option<Duration>,

    /// Start a worker run right after a submission is queued (default: false)
    #[serde(default)]
    pub trigger_on_enqueue: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            secret: None,
            trusted_scheduler_header: None,
            require_secret: true,
            time_budget: default_time_budget(),
            job_timeout: default_job_timeout(),
            poll_interval: None,
            trigger_on_enqueue: false,
        }
    }
}

/// Telegram Bot API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; without it notifications are dropped
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Bot API base URL (default: "https://api.telegram.org")
    #[serde(default = "default_telegram_api")]
    pub api_base_url: String,

    /// Accepted values of the `X-Telegram-Bot-Api-Secret-Token` header
    #[serde(default)]
    pub webhook_secrets: Vec<String>,

    /// Timeout for one Bot API request (default: 10 seconds)
    #[serde(default = "default_telegram_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Minimum length of a free-text submission (default: 100 characters)
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,

    /// URLs accepted from a single message (default: 5)
    #[serde(default = "default_max_batch_urls")]
    pub max_batch_urls: usize,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base_url: default_telegram_api(),
            webhook_secrets: Vec::new(),
            request_timeout: default_telegram_timeout(),
            min_text_length: default_min_text_length(),
            max_batch_urls: default_max_batch_urls(),
        }
    }
}

/// External collaborator configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// API key for the OpenAI-compatible text generator
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API (default: "https://api.openai.com/v1")
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Chat model (default: "gpt-4o-mini")
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Image service endpoint; images are skipped when unset
    #[serde(default)]
    pub image_endpoint: Option<String>,

    /// Timeout for fetching and extracting a source page (default: 30 seconds)
    #[serde(default = "default_extraction_timeout", with = "duration_serde")]
    pub extraction_timeout: Duration,

    /// Timeout for one rewrite or translation (default: 60 seconds)
    #[serde(default = "default_generation_timeout", with = "duration_serde")]
    pub generation_timeout: Duration,

    /// Timeout for one image request (default: 30 seconds)
    #[serde(default = "default_image_timeout", with = "duration_serde")]
    pub image_timeout: Duration,

    /// User-Agent sent when fetching source pages
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            openai_model: default_openai_model(),
            image_endpoint: None,
            extraction_timeout: default_extraction_timeout(),
            generation_timeout: default_generation_timeout(),
            image_timeout: default_image_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Pending selection configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingConfig {
    /// Lifetime of a draft awaiting category choice (default: 300 seconds)
    #[serde(default = "default_pending_ttl", with = "duration_serde")]
    pub ttl: Duration,

    /// Interval of the expired-draft sweep (default: 60 seconds)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    pub sweep_interval: Duration,
}

impl Default for PendingConfig {
    fn default() -> Self {
        Self {
            ttl: default_pending_ttl(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Published site configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site root used to build article URLs (default: "https://example.com")
    #[serde(default = "default_site_base_url")]
    pub base_url: String,

    /// Languages to publish in; the first one is the source language (default: [en, pl])
    #[serde(default = "default_target_languages")]
    pub target_languages: Vec<Language>,

    /// Maximum slug length including the language suffix (default: 60)
    #[serde(default = "default_slug_max_length")]
    pub slug_max_length: usize,

    /// Category used when none is chosen or recognized (default: "tech")
    #[serde(default = "default_category")]
    pub default_category: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_site_base_url(),
            target_languages: default_target_languages(),
            slug_max_length: default_slug_max_length(),
            default_category: default_category(),
        }
    }
}

impl SiteConfig {
    /// Public URL of an article
    pub fn article_url(&self, language: Language, slug: &str) -> String {
        format!(
            "{}/{}/article/{}",
            self.base_url.trim_end_matches('/'),
            language.code(),
            slug
        )
    }
}

/// Per-chat defaults used until a chat saves its own settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmissionDefaults {
    /// Content style (default: journalistic)
    #[serde(default)]
    pub content_style: ContentStyle,

    /// Images per article, 0-3 (default: 2)
    #[serde(default = "default_images_count")]
    pub images_count: u8,

    /// Image source (default: unsplash)
    #[serde(default)]
    pub images_source: ImageSource,

    /// Publish immediately instead of saving drafts (default: true)
    #[serde(default = "default_true")]
    pub auto_publish: bool,
}

impl Default for SubmissionDefaults {
    fn default() -> Self {
        Self {
            content_style: ContentStyle::default(),
            images_count: default_images_count(),
            images_source: ImageSource::default(),
            auto_publish: true,
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8787)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Optional API key guarding the operations endpoints
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./submission-pipeline.db")
}

fn default_true() -> bool {
    true
}

fn default_lease_duration() -> Duration {
    Duration::from_secs(300)
}

fn default_job_max_attempts() -> u32 {
    3
}

fn default_batch() -> u32 {
    2
}

fn default_max_batch() -> u32 {
    10
}

fn default_stale_scan_limit() -> u32 {
    50
}

fn default_dedup_window() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_backoff_initial() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_max() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_time_budget() -> Duration {
    Duration::from_secs(240)
}

fn default_job_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

fn default_telegram_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_min_text_length() -> usize {
    100
}

fn default_max_batch_urls() -> usize {
    5
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_extraction_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_generation_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_image_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("submission-pipeline/{}", env!("CARGO_PKG_VERSION"))
}

fn default_pending_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_site_base_url() -> String {
    "https://example.com".to_string()
}

fn default_target_languages() -> Vec<Language> {
    vec![Language::En, Language::Pl]
}

fn default_slug_max_length() -> usize {
    60
}

fn default_category() -> String {
    "tech".to_string()
}

fn default_images_count() -> u8 {
    2
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper (seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
