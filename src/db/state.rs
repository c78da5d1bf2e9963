//! Webhook delivery tracking.

use crate::error::DatabaseError;
use crate::utils::now_millis;
use crate::{Error, Result};
use std::time::Duration;

use super::Database;

impl Database {
    /// Remember a Telegram update id
    ///
    /// Returns false when the update was already recorded, meaning Telegram
    /// redelivered it and it must not be handled again.
    pub async fn record_webhook_update(&self, update_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO webhook_updates (update_id, received_at) VALUES (?, ?) ON CONFLICT(update_id) DO NOTHING",
        )
        .bind(update_id)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to record webhook update: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Forget update ids received more than `older_than` ago
    pub async fn purge_webhook_updates(&self, older_than: Duration) -> Result<u64> {
        let cutoff =
            now_millis().saturating_sub(i64::try_from(older_than.as_millis()).unwrap_or(i64::MAX));

        let result = sqlx::query("DELETE FROM webhook_updates WHERE received_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to purge webhook updates: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
