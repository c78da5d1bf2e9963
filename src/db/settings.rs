//! Per-chat preferences.

use crate::config::SubmissionDefaults;
use crate::error::DatabaseError;
use crate::types::{ChatSettings, InterfaceLanguage};
use crate::utils::now_millis;
use crate::{Error, Result};

use super::{ChatSettingsRow, Database};

impl Database {
    /// Get the saved settings of a chat
    pub async fn get_chat_settings(&self, chat_id: i64) -> Result<Option<ChatSettings>> {
        let row = sqlx::query_as::<_, ChatSettingsRow>(
            r#"
            SELECT chat_id, content_style, images_count, images_source,
                   auto_publish, interface_language, combine_urls
            FROM chat_settings
            WHERE chat_id = ?
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get chat settings: {}",
                e
            )))
        })?;

        Ok(row.map(ChatSettings::from))
    }

    /// Saved settings of a chat, or the configured defaults
    pub async fn chat_settings_or_default(
        &self,
        chat_id: i64,
        defaults: &SubmissionDefaults,
        interface_language: InterfaceLanguage,
    ) -> Result<ChatSettings> {
        Ok(self
            .get_chat_settings(chat_id)
            .await?
            .unwrap_or_else(|| ChatSettings {
                chat_id,
                content_style: defaults.content_style,
                images_count: defaults.images_count,
                images_source: defaults.images_source,
                auto_publish: defaults.auto_publish,
                interface_language,
                combine_urls: false,
            }))
    }

    /// Insert or replace the settings of a chat
    pub async fn save_chat_settings(&self, settings: &ChatSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_settings (
                chat_id, content_style, images_count, images_source,
                auto_publish, interface_language, combine_urls, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET
                content_style = excluded.content_style,
                images_count = excluded.images_count,
                images_source = excluded.images_source,
                auto_publish = excluded.auto_publish,
                interface_language = excluded.interface_language,
                combine_urls = excluded.combine_urls,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(settings.chat_id)
        .bind(settings.content_style.as_str())
        .bind(i64::from(settings.images_count.min(3)))
        .bind(settings.images_source.as_str())
        .bind(settings.auto_publish)
        .bind(settings.interface_language.code())
        .bind(settings.combine_urls)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to save chat settings: {}",
                e
            )))
        })?;

        Ok(())
    }
}
