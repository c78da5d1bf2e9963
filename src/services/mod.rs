//! External collaborators of the submission processor
//!
//! Each collaborator sits behind an async trait so the processor can run against
//! real HTTP services in production and scripted fakes in tests:
//!
//! - [`ContentExtractor`]: fetches a page and pulls out the article
//!   ([`HtmlExtractor`])
//! - [`TextGenerator`]: rewrites and translates articles
//!   ([`OpenAiTextGenerator`], or [`UnconfiguredTextGenerator`] without an API key)
//! - [`ImageProvider`]: finds an image for an article
//!   ([`HttpImageProvider`], or [`NoOpImageProvider`] without an endpoint)

use crate::Result;
use crate::types::{ContentStyle, ImageSource, Language};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod extractor;
mod images;
mod openai;

pub use extractor::HtmlExtractor;
pub use images::{HttpImageProvider, NoOpImageProvider};
pub use openai::{OpenAiTextGenerator, UnconfiguredTextGenerator};

/// Article pulled out of a source page
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedArticle {
    /// Headline
    pub title: String,
    /// Body paragraphs separated by blank lines
    pub content: String,
    /// Summary from the page metadata
    pub excerpt: Option<String>,
    /// Byline
    pub author: Option<String>,
    /// Publication time as given by the page
    pub published_at: Option<String>,
    /// Lead image URL
    pub image: Option<String>,
    /// Section or category from the page metadata
    pub category: Option<String>,
    /// Language declared by the page
    pub language: Option<String>,
    /// URL the article was fetched from
    pub source: String,
}

/// Input of a rewrite
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewriteRequest {
    /// Source headline
    pub title: String,
    /// Source body
    pub content: String,
    /// Requested style
    pub style: ContentStyle,
    /// Language to write in
    pub language: Language,
    /// Category hint
    pub category: Option<String>,
}

/// Article produced by a rewrite
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArticle {
    /// Headline
    pub title: String,
    /// Body
    pub content: String,
    /// Summary
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Category suggested by the generator
    #[serde(default)]
    pub category: Option<String>,
}

/// Article variant in a secondary language
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedArticle {
    /// Target language
    pub language: Language,
    /// Headline
    pub title: String,
    /// Body, with the paragraph structure of the original
    pub content: String,
    /// Summary
    pub excerpt: Option<String>,
}

/// Input of an image lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRequest {
    /// Article headline
    pub title: String,
    /// Article summary
    pub excerpt: String,
    /// Article category
    pub category: String,
    /// Where the image should come from
    pub source: ImageSource,
    /// Position of the image in the article, starting at 0
    pub index: u8,
}

/// Fetches a source page and extracts the article
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Fetch `url` and extract its article
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ExternalService`] or [`crate::Error::Network`] when
    /// the page cannot be fetched, and [`crate::Error::Validation`] when it holds
    /// no readable content.
    async fn extract(&self, url: &str) -> Result<ExtractedArticle>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Rewrites and translates articles
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Rewrite an article in the requested style
    async fn rewrite(&self, request: RewriteRequest) -> Result<GeneratedArticle>;

    /// Translate an article, keeping its paragraph structure
    async fn translate(
        &self,
        article: GeneratedArticle,
        language: Language,
    ) -> Result<TranslatedArticle>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Finds images for articles
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Return the URL of one image for the article
    async fn fetch_image(&self, request: ImageRequest) -> Result<String>;

    /// Whether this provider can return images at all
    fn is_enabled(&self) -> bool {
        true
    }

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
