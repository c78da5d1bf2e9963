//! Chat notifications
//!
//! The [`Notifier`] trait covers the four Bot API calls the pipeline needs:
//! sending and editing messages (with optional inline keyboards) and answering
//! callback queries. [`TelegramNotifier`] talks to the Bot API; [`NoOpNotifier`]
//! drops everything and is used when no bot token is configured.
//!
//! Callers treat notification failures as non-fatal: they log them and carry on.

use crate::Result;
use async_trait::async_trait;
use serde::Serialize;

mod noop;
mod telegram;

pub use noop::NoOpNotifier;
pub use telegram::TelegramNotifier;

/// One button of an inline keyboard
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    /// Label shown to the user
    pub text: String,
    /// Data sent back in the callback query
    pub callback_data: String,
}

impl InlineButton {
    /// Create a callback button
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Inline keyboard attached to a message
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    /// Rows of buttons, top to bottom
    #[serde(rename = "inline_keyboard")]
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// Append a row of buttons
    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.rows.push(buttons);
        self
    }

    /// All callback data values, row by row
    pub fn callback_data(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .map(|b| b.callback_data.as_str())
            .collect()
    }
}

/// Sends messages to chats
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send an HTML message, returning its message id when known
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Option<i64>>;

    /// Replace the text (and keyboard) of an existing message
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()>;

    /// Edit `message_id` when given, falling back to a new message if the edit fails
    async fn edit_or_send(
        &self,
        chat_id: i64,
        message_id: Option<i64>,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Option<i64>> {
        if let Some(message_id) = message_id {
            match self.edit_message(chat_id, message_id, text, keyboard).await {
                Ok(()) => return Ok(Some(message_id)),
                Err(e) => {
                    tracing::debug!(chat_id, message_id, error = %e, "edit failed, sending new message");
                }
            }
        }
        self.send_message(chat_id, text, keyboard).await
    }

    /// Acknowledge a callback query, optionally with a toast
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
