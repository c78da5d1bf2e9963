//! Drafts awaiting a category choice, one per chat, expiring after a TTL.

use crate::error::DatabaseError;
use crate::utils::now_millis;
use crate::{Error, Result};
use std::time::Duration;

use super::{Database, PendingDraft, PendingSelection};

fn cutoff(ttl: Duration) -> i64 {
    now_millis().saturating_sub(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

impl Database {
    /// Store a draft for a chat, replacing any previous one
    ///
    /// Replacing resets the TTL.
    pub async fn set_pending_selection(&self, chat_id: i64, draft: &PendingDraft) -> Result<()> {
        let now = now_millis();

        sqlx::query(
            r#"
            INSERT INTO pending_selections (
                chat_id, title, content, excerpt, category,
                word_count, is_url, original_text, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                excerpt = excluded.excerpt,
                category = excluded.category,
                word_count = excluded.word_count,
                is_url = excluded.is_url,
                original_text = excluded.original_text,
                created_at = excluded.created_at
            "#,
        )
        .bind(chat_id)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.excerpt)
        .bind(&draft.category)
        .bind(i64::from(draft.word_count))
        .bind(draft.is_url)
        .bind(&draft.original_text)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to store pending selection: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get the live draft for a chat
    ///
    /// An expired draft is deleted and reported as missing.
    pub async fn get_pending_selection(
        &self,
        chat_id: i64,
        ttl: Duration,
    ) -> Result<Option<PendingSelection>> {
        let selection = sqlx::query_as::<_, PendingSelection>(
            r#"
            SELECT chat_id, title, content, excerpt, category,
                   word_count, is_url, original_text, created_at
            FROM pending_selections
            WHERE chat_id = ?
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get pending selection: {}",
                e
            )))
        })?;

        match selection {
            Some(selection) if selection.created_at < cutoff(ttl) => {
                tracing::debug!(chat_id, "pending selection expired");
                sqlx::query("DELETE FROM pending_selections WHERE chat_id = ? AND created_at = ?")
                    .bind(chat_id)
                    .bind(selection.created_at)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::QueryFailed(format!(
                            "Failed to delete expired pending selection: {}",
                            e
                        )))
                    })?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Change the category of a live draft
    ///
    /// Returns false when there is no draft or it has expired.
    pub async fn update_pending_category(
        &self,
        chat_id: i64,
        category: &str,
        ttl: Duration,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE pending_selections SET category = ? WHERE chat_id = ? AND created_at >= ?",
        )
        .bind(category)
        .bind(chat_id)
        .bind(cutoff(ttl))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update pending category: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete the draft of a chat
    pub async fn remove_pending_selection(&self, chat_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pending_selections WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to remove pending selection: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every expired draft, returning how many were removed
    pub async fn sweep_expired_pending(&self, ttl: Duration) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pending_selections WHERE created_at < ?")
            .bind(cutoff(ttl))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to sweep pending selections: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
