//! Shared test helpers: scripted collaborators and a pipeline on a temp database.

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::notifier::{InlineKeyboard, Notifier};
use crate::pipeline::{Collaborators, Pipeline};
use crate::services::{
    ContentExtractor, ExtractedArticle, GeneratedArticle, ImageProvider, ImageRequest,
    RewriteRequest, TextGenerator, TranslatedArticle,
};
use crate::types::{ContentStyle, ImageOptions, ImageSource, InterfaceLanguage, Language, SubmissionPayload};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Body long enough to pass every length check, four paragraphs
pub(crate) const ARTICLE_BODY: &str = "The first paragraph explains what happened and why it matters to readers.\n\n\
     The second paragraph adds background on the companies and people involved.\n\n\
     The third paragraph covers reactions from analysts and the wider industry.\n\n\
     The fourth paragraph looks at what is expected to happen next.";

/// Extractor answering from a fixed page table
#[derive(Default)]
pub(crate) struct FakeExtractor {
    pages: Mutex<HashMap<String, ExtractedArticle>>,
    calls: AtomicUsize,
}

impl FakeExtractor {
    /// Serve an article with `title` and [`ARTICLE_BODY`] at `url`
    pub(crate) fn with_page(self, url: &str, title: &str) -> Self {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            ExtractedArticle {
                title: title.to_string(),
                content: ARTICLE_BODY.to_string(),
                excerpt: None,
                image: Some(format!("{}/og.jpg", url)),
                source: url.to_string(),
                ..Default::default()
            },
        );
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentExtractor for FakeExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedArticle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::external("extractor", format!("{} is unreachable", url)))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Generator that keeps the text and can be told to fail
#[derive(Default)]
pub(crate) struct FakeGenerator {
    pub(crate) fail_translate: AtomicBool,
    rewrites: AtomicUsize,
}

impl FakeGenerator {
    pub(crate) fn rewrites(&self) -> usize {
        self.rewrites.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn rewrite(&self, request: RewriteRequest) -> Result<GeneratedArticle> {
        self.rewrites.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedArticle {
            title: request.title,
            content: request.content,
            excerpt: None,
            category: Some("ai".to_string()),
        })
    }

    async fn translate(
        &self,
        article: GeneratedArticle,
        language: Language,
    ) -> Result<TranslatedArticle> {
        if self.fail_translate.load(Ordering::SeqCst) {
            return Err(Error::external("fake", "translation backend down"));
        }
        Ok(TranslatedArticle {
            language,
            title: article.title,
            content: article.content,
            excerpt: article.excerpt,
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Image provider returning `https://img.test/{index}.jpg`
#[derive(Default)]
pub(crate) struct FakeImages {
    /// Index whose fetch fails
    pub(crate) fail_index: Option<u8>,
}

#[async_trait]
impl ImageProvider for FakeImages {
    async fn fetch_image(&self, request: ImageRequest) -> Result<String> {
        if self.fail_index == Some(request.index) {
            return Err(Error::external("images", "no image found"));
        }
        Ok(format!("https://img.test/{}.jpg", request.index))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// A message as seen by the [`RecordingNotifier`]
#[derive(Clone, Debug)]
pub(crate) struct Recorded {
    pub(crate) chat_id: i64,
    pub(crate) message_id: Option<i64>,
    pub(crate) text: String,
    pub(crate) keyboard: Option<InlineKeyboard>,
}

/// Notifier that records every call
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<Recorded>>,
    edited: Mutex<Vec<Recorded>>,
    callbacks: Mutex<Vec<(String, Option<String>)>>,
    next_id: AtomicI64,
}

impl RecordingNotifier {
    pub(crate) fn sent(&self) -> Vec<Recorded> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn edited(&self) -> Vec<Recorded> {
        self.edited.lock().unwrap().clone()
    }

    pub(crate) fn callbacks(&self) -> Vec<(String, Option<String>)> {
        self.callbacks.lock().unwrap().clone()
    }

    /// Text of every send and edit, in call order within each kind
    pub(crate) fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .chain(self.edited())
            .map(|r| r.text)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Option<i64>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.lock().unwrap().push(Recorded {
            chat_id,
            message_id: Some(id),
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(Some(id))
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        self.edited.lock().unwrap().push(Recorded {
            chat_id,
            message_id: Some(message_id),
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.callbacks
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// A pipeline wired to fakes, with handles to inspect them
pub(crate) struct TestHarness {
    pub(crate) pipeline: Pipeline,
    pub(crate) extractor: Arc<FakeExtractor>,
    pub(crate) generator: Arc<FakeGenerator>,
    pub(crate) notifier: Arc<RecordingNotifier>,
    _temp_dir: tempfile::TempDir,
}

/// Config for tests: no retry delay, images off, budget generous
pub(crate) fn test_config(db_path: std::path::PathBuf) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = db_path;
    config.site.base_url = "https://news.test".to_string();
    config.site.target_languages = vec![Language::En, Language::Pl];
    config.queue.backoff.initial_delay = Duration::ZERO;
    config.queue.backoff.jitter = false;
    config.defaults.images_count = 0;
    config.defaults.images_source = ImageSource::None;
    config.worker.trigger_on_enqueue = false;
    config
}

/// Build a harness; `configure` may adjust the config before the pipeline is built
pub(crate) async fn create_test_pipeline_with(
    extractor: FakeExtractor,
    images: FakeImages,
    configure: impl FnOnce(&mut Config),
) -> TestHarness {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path().join("test.db"));
    configure(&mut config);

    let db = Database::new(&config.persistence.database_path)
        .await
        .unwrap();

    let extractor = Arc::new(extractor);
    let generator = Arc::new(FakeGenerator::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let services = Collaborators {
        extractor: extractor.clone(),
        generator: generator.clone(),
        images: Arc::new(images),
        notifier: notifier.clone(),
    };

    TestHarness {
        pipeline: Pipeline::with_collaborators(config, db, services),
        extractor,
        generator,
        notifier,
        _temp_dir: temp_dir,
    }
}

/// Harness serving "Example" at `https://example.com/a`
pub(crate) async fn create_test_pipeline() -> TestHarness {
    create_test_pipeline_with(
        FakeExtractor::default().with_page("https://example.com/a", "Example"),
        FakeImages::default(),
        |_| {},
    )
    .await
}

/// Payload for a single URL with test defaults
pub(crate) fn url_payload(url: &str) -> SubmissionPayload {
    SubmissionPayload {
        chat_id: 1,
        user_id: 10,
        username: Some("tester".to_string()),
        url: Some(url.to_string()),
        urls: Vec::new(),
        text: None,
        category: None,
        style: ContentStyle::Journalistic,
        images: ImageOptions {
            count: 0,
            source: ImageSource::None,
        },
        target_languages: vec![Language::En, Language::Pl],
        interface_language: InterfaceLanguage::En,
        auto_publish: true,
        submission_id: None,
    }
}
