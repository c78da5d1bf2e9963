//! HTML article extraction over reqwest and scraper

use super::{ContentExtractor, ExtractedArticle};
use crate::config::ServicesConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Headline candidates, most specific first
const TITLE_SELECTORS: [&str; 5] = ["h1", "article h1", ".article-title", "[class*='title']", "title"];

/// Paragraph candidates, most specific first
const PARAGRAPH_SELECTORS: [&str; 6] = [
    "article p",
    ".article-content p",
    ".post-content p",
    "[class*='content'] p",
    "main p",
    "p",
];

/// Shorter headlines are usually site names or navigation
const MIN_TITLE_CHARS: usize = 10;

/// Shorter paragraphs are usually navigation, captions, or footers
const MIN_PARAGRAPH_CHARS: usize = 50;

/// Stop looking at broader selectors once this many paragraphs are found
const ENOUGH_PARAGRAPHS: usize = 3;

const FALLBACK_TITLE: &str = "Untitled Article";

/// Fetches pages with reqwest and extracts the article with CSS selectors
///
/// No JavaScript is executed, so client-rendered pages yield little content.
pub struct HtmlExtractor {
    client: reqwest::Client,
}

impl HtmlExtractor {
    /// Build an extractor with the configured timeout and user agent
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.extraction_timeout)
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::external(
                "extractor",
                format!("HTTP {} for {}", status, url),
            ));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ContentExtractor for HtmlExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedArticle> {
        let base = Url::parse(url).map_err(|e| Error::Validation(format!("invalid URL '{}': {}", url, e)))?;

        tracing::debug!(url, "fetching source page");
        let html = self.fetch_html(url).await?;
        let article = parse_article(&html, &base)?;

        tracing::debug!(
            url,
            title = %article.title,
            chars = article.content.len(),
            "extracted article"
        );
        Ok(article)
    }

    fn name(&self) -> &'static str {
        "html"
    }
}

/// Extract the article from a fetched page
pub(crate) fn parse_article(html: &str, base: &Url) -> Result<ExtractedArticle> {
    let document = Html::parse_document(html);

    let paragraphs = extract_paragraphs(&document);
    if paragraphs.is_empty() {
        return Err(Error::Validation(format!(
            "no readable content found at {}",
            base
        )));
    }

    let title = meta_content(&document, "meta[property='og:title']")
        .filter(|t| t.chars().count() > MIN_TITLE_CHARS)
        .or_else(|| extract_title(&document))
        .unwrap_or_else(|| FALLBACK_TITLE.to_string());

    let image = meta_content(&document, "meta[property='og:image']")
        .and_then(|src| base.join(&src).ok())
        .map(|u| u.to_string());

    let language = select_first(&document, "html")
        .and_then(|el| el.value().attr("lang").map(str::to_string))
        .filter(|l| !l.is_empty());

    Ok(ExtractedArticle {
        title,
        content: paragraphs.join("\n\n"),
        excerpt: meta_content(&document, "meta[property='og:description']")
            .or_else(|| meta_content(&document, "meta[name='description']")),
        author: meta_content(&document, "meta[name='author']"),
        published_at: meta_content(&document, "meta[property='article:published_time']"),
        image,
        category: meta_content(&document, "meta[property='article:section']"),
        language,
        source: base.to_string(),
    })
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<scraper::ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    select_first(document, selector)
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn element_text(element: scraper::ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_title(document: &Html) -> Option<String> {
    TITLE_SELECTORS.iter().find_map(|selector| {
        select_first(document, selector)
            .map(element_text)
            .filter(|t| t.chars().count() > MIN_TITLE_CHARS)
    })
}

fn extract_paragraphs(document: &Html) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut paragraphs = Vec::new();

    for selector_str in PARAGRAPH_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };

        for element in document.select(&selector) {
            let text = element_text(element);
            if text.chars().count() > MIN_PARAGRAPH_CHARS && seen.insert(text.clone()) {
                paragraphs.push(text);
            }
        }

        if paragraphs.len() >= ENOUGH_PARAGRAPHS {
            break;
        }
    }

    paragraphs
}
