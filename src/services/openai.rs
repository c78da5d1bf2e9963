//! Text generation over an OpenAI-compatible chat completions API

use super::{GeneratedArticle, RewriteRequest, TextGenerator, TranslatedArticle};
use crate::config::ServicesConfig;
use crate::content::CATEGORIES;
use crate::types::Language;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const SERVICE: &str = "openai";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Text generator backed by `/chat/completions` with JSON output
pub struct OpenAiTextGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiTextGenerator {
    /// Build a generator from the services configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no API key is configured.
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::config("services.openai_api_key", "OpenAI API key is not set"))?;

        let client = reqwest::Client::builder()
            .timeout(config.generation_timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
        })
    }

    /// Run one completion and decode the JSON object it returns
    async fn complete<T: serde::de::DeserializeOwned>(&self, system: String, user: String) -> Result<T> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.7,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::external(
                SERVICE,
                format!(
                    "HTTP {}: {}",
                    status,
                    crate::utils::truncate_chars(&body, 200)
                ),
            ));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::external(SERVICE, format!("malformed response: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::external(SERVICE, "empty completion"))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::external(SERVICE, format!("completion is not the expected JSON: {}", e)))
    }
}

#[derive(Deserialize)]
struct TranslationReply {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    excerpt: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn rewrite(&self, request: RewriteRequest) -> Result<GeneratedArticle> {
        let system = format!(
            "You are an editor of a technology news site. {} Write in {}. \
             Use plain paragraphs separated by blank lines, without markdown. \
             Reply with a JSON object with the keys \"title\", \"content\", \"excerpt\" \
             (at most 160 characters) and \"category\" (one of: {}).",
            request.style.instruction(),
            request.language.name(),
            CATEGORIES.join(", ")
        );
        let mut user = format!("Title: {}\n\n{}", request.title, request.content);
        if let Some(category) = &request.category {
            user.push_str(&format!("\n\nSuggested category: {}", category));
        }

        tracing::debug!(style = request.style.as_str(), "requesting rewrite");
        let article: GeneratedArticle = self.complete(system, user).await?;

        if article.title.trim().is_empty() || article.content.trim().is_empty() {
            return Err(Error::external(SERVICE, "rewrite returned an empty article"));
        }
        Ok(article)
    }

    async fn translate(
        &self,
        article: GeneratedArticle,
        language: Language,
    ) -> Result<TranslatedArticle> {
        let system = format!(
            "Translate the article into {}. Keep every paragraph and the blank lines \
             between them; do not add or remove content. Reply with a JSON object with \
             the keys \"title\", \"content\" and \"excerpt\".",
            language.name()
        );
        let user = serde_json::json!({
            "title": article.title,
            "content": article.content,
            "excerpt": article.excerpt,
        })
        .to_string();

        tracing::debug!(language = language.code(), "requesting translation");
        let reply: TranslationReply = self.complete(system, user).await?;

        if reply.title.trim().is_empty() || reply.content.trim().is_empty() {
            return Err(Error::external(
                SERVICE,
                format!("empty {} translation", language.name()),
            ));
        }

        Ok(TranslatedArticle {
            language,
            title: reply.title,
            content: reply.content,
            excerpt: reply.excerpt,
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Text generator used when no API key is configured
///
/// Every call fails with a configuration error, so submissions that need a
/// rewrite or translation fail without retries. `keep_as_is` submissions in a
/// single language still work.
pub struct UnconfiguredTextGenerator;

#[async_trait]
impl TextGenerator for UnconfiguredTextGenerator {
    async fn rewrite(&self, _request: RewriteRequest) -> Result<GeneratedArticle> {
        Err(Error::config(
            "services.openai_api_key",
            "text generation requires an OpenAI API key",
        ))
    }

    async fn translate(
        &self,
        _article: GeneratedArticle,
        _language: Language,
    ) -> Result<TranslatedArticle> {
        Err(Error::config(
            "services.openai_api_key",
            "translation requires an OpenAI API key",
        ))
    }

    fn name(&self) -> &'static str {
        "unconfigured"
    }
}
