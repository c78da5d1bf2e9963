//! Test environment: a pipeline wired to wiremock-backed collaborators

use std::time::Duration;
use submission_pipeline::{Config, ContentStyle, ImageSource, Pipeline};
use tempfile::TempDir;
use wiremock::MockServer;

/// Bot token used by every test environment
pub const BOT_TOKEN: &str = "test-token";

/// Public site base URL used by every test environment
pub const SITE_BASE_URL: &str = "https://news.test";

/// A pipeline with its mock servers
///
/// - `telegram` plays the Bot API
/// - `openai` plays the chat completions API
/// - `site` serves source pages
pub struct TestEnv {
    /// Pipeline under test
    pub pipeline: Pipeline,
    /// Bot API mock
    pub telegram: MockServer,
    /// Chat completions mock
    pub openai: MockServer,
    /// Source page mock
    pub site: MockServer,
    _temp_dir: TempDir,
}

impl TestEnv {
    /// Absolute URL of a path on the source site mock
    pub fn site_url(&self, path: &str) -> String {
        format!("{}{}", self.site.uri(), path)
    }
}

/// Config pointing every collaborator at the mocks
///
/// Sources are published verbatim (`keep_as_is`) so only translations reach the
/// generator; images are off; retries are immediate.
pub fn test_config(temp_dir: &TempDir, telegram: &MockServer, openai: &MockServer) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = temp_dir.path().join("pipeline.db");

    config.telegram.bot_token = Some(BOT_TOKEN.to_string());
    config.telegram.api_base_url = telegram.uri();
    config.telegram.request_timeout = Duration::from_secs(5);

    config.services.openai_api_key = Some("sk-test".to_string());
    config.services.openai_base_url = openai.uri();
    config.services.extraction_timeout = Duration::from_secs(5);

    config.defaults.content_style = ContentStyle::KeepAsIs;
    config.defaults.images_count = 0;
    config.defaults.images_source = ImageSource::None;

    config.queue.backoff.initial_delay = Duration::ZERO;
    config.queue.backoff.jitter = false;
    config.retry.max_attempts = 1;

    config.site.base_url = SITE_BASE_URL.to_string();
    config.worker.trigger_on_enqueue = false;
    config
}

/// Start the mocks and build a pipeline; `configure` may adjust the config
pub async fn create_test_env(configure: impl FnOnce(&mut Config)) -> TestEnv {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let telegram = MockServer::start().await;
    let openai = MockServer::start().await;
    let site = MockServer::start().await;

    let mut config = test_config(&temp_dir, &telegram, &openai);
    configure(&mut config);
    config.validate().expect("valid test config");

    let pipeline = Pipeline::new(config).await.expect("pipeline");

    TestEnv {
        pipeline,
        telegram,
        openai,
        site,
        _temp_dir: temp_dir,
    }
}
