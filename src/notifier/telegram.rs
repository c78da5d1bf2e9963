//! Telegram Bot API notifier

use super::{InlineKeyboard, Notifier};
use crate::config::{RetryConfig, TelegramConfig};
use crate::retry::{with_retry, with_timeout};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const SERVICE: &str = "telegram";

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

/// Notifier posting to `{api_base_url}/bot{token}/{method}`
///
/// Messages use HTML parse mode with link previews disabled. Transient failures
/// (timeouts, 5xx, 429) are retried per the in-call retry settings; requests the
/// Bot API rejects are not.
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl TelegramNotifier {
    /// Build a notifier for the configured bot
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no bot token is configured.
    pub fn new(config: &TelegramConfig, retry: RetryConfig) -> Result<Self> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::config("telegram.bot_token", "bot token is not set"))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: format!("{}/bot{}", config.api_base_url.trim_end_matches('/'), token),
            timeout: config.request_timeout,
            retry,
        })
    }

    async fn call(&self, method: &str, body: &Value) -> Result<Value> {
        let operation = format!("telegram {}", method);
        with_retry(&self.retry, || {
            with_timeout(self.timeout, &operation, self.call_once(method, body))
        })
        .await
    }

    async fn call_once(&self, method: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let reply: Option<ApiResponse> = response.json().await.ok();

        match reply {
            Some(ApiResponse {
                ok: true, result, ..
            }) => Ok(result.unwrap_or(Value::Null)),
            reply => {
                let description = reply
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| status.to_string());
                if status.is_server_error() || status.as_u16() == 429 {
                    Err(Error::external(
                        SERVICE,
                        format!("{} failed: {}", method, description),
                    ))
                } else {
                    Err(Error::Other(format!(
                        "telegram rejected {}: {}",
                        method, description
                    )))
                }
            }
        }
    }
}

fn with_keyboard(mut body: Value, keyboard: Option<&InlineKeyboard>) -> Value {
    if let Some(keyboard) = keyboard {
        body["reply_markup"] = json!(keyboard);
    }
    body
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Option<i64>> {
        let body = with_keyboard(
            json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }),
            keyboard,
        );

        let result = self.call("sendMessage", &body).await?;
        Ok(result.get("message_id").and_then(Value::as_i64))
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        let body = with_keyboard(
            json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }),
            keyboard,
        );

        match self.call("editMessageText", &body).await {
            Ok(_) => Ok(()),
            // Editing to identical content is not a failure
            Err(Error::Other(message)) if message.contains("message is not modified") => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
