//! Notifier that drops every message

use super::{InlineKeyboard, Notifier};
use crate::Result;
use async_trait::async_trait;

/// Notifier used when no bot token is configured
///
/// Messages are logged at debug level and dropped.
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        _keyboard: Option<&InlineKeyboard>,
    ) -> Result<Option<i64>> {
        tracing::debug!(chat_id, chars = text.len(), "no bot token, dropping message");
        Ok(None)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        _text: &str,
        _keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        tracing::debug!(chat_id, message_id, "no bot token, dropping edit");
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
