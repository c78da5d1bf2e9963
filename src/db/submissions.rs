//! Submission records: one row per intake, shared by every language variant.

use crate::error::DatabaseError;
use crate::types::{SubmissionId, SubmissionStatus};
use crate::utils::now_millis;
use crate::{Error, Result};
use std::time::Duration;

use super::{Database, NewSubmission, Submission};

const SUBMISSION_COLUMNS: &str = "id, chat_id, user_id, username, kind, source, source_hash, \
     status, title, category, error_message, processing_ms, created_at, updated_at";

impl Database {
    /// Insert a queued submission
    pub async fn create_submission(&self, submission: &NewSubmission) -> Result<SubmissionId> {
        let now = now_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO submissions (
                chat_id, user_id, username, kind, source, source_hash,
                status, category, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(submission.chat_id)
        .bind(submission.user_id)
        .bind(&submission.username)
        .bind(&submission.kind)
        .bind(&submission.source)
        .bind(&submission.source_hash)
        .bind(SubmissionStatus::Queued.as_str())
        .bind(&submission.category)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to create submission: {}",
                e
            )))
        })?;

        Ok(SubmissionId(result.last_insert_rowid()))
    }

    /// Get a submission by ID
    pub async fn get_submission(&self, id: SubmissionId) -> Result<Option<Submission>> {
        let sql = format!("SELECT {} FROM submissions WHERE id = ?", SUBMISSION_COLUMNS);
        let submission = sqlx::query_as::<_, Submission>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get submission: {}",
                    e
                )))
            })?;

        Ok(submission)
    }

    /// Mark a submission as being processed
    pub async fn mark_submission_processing(&self, id: SubmissionId) -> Result<()> {
        sqlx::query(
            "UPDATE submissions SET status = ?, error_message = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(SubmissionStatus::Processing.as_str())
        .bind(now_millis())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark submission processing: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Mark a submission as published
    pub async fn mark_submission_published(
        &self,
        id: SubmissionId,
        title: &str,
        category: &str,
        processing_ms: u64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE submissions
            SET status = ?, title = ?, category = ?, processing_ms = ?,
                error_message = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(SubmissionStatus::Published.as_str())
        .bind(title)
        .bind(category)
        .bind(i64::try_from(processing_ms).unwrap_or(i64::MAX))
        .bind(now_millis())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark submission published: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Mark a submission as failed
    pub async fn mark_submission_failed(&self, id: SubmissionId, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE submissions SET status = ?, error_message = ?, updated_at = ? WHERE id = ?",
        )
        .bind(SubmissionStatus::Failed.as_str())
        .bind(error)
        .bind(now_millis())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark submission failed: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Latest non-failed submission of the same source by the same user within `window`
    pub async fn find_recent_duplicate(
        &self,
        user_id: i64,
        source_hash: &str,
        window: Duration,
    ) -> Result<Option<Submission>> {
        let since = now_millis().saturating_sub(i64::try_from(window.as_millis()).unwrap_or(i64::MAX));
        let sql = format!(
            r#"
            SELECT {} FROM submissions
            WHERE user_id = ? AND source_hash = ? AND status != 'failed' AND created_at >= ?
            ORDER BY id DESC
            LIMIT 1
            "#,
            SUBMISSION_COLUMNS
        );

        let submission = sqlx::query_as::<_, Submission>(&sql)
            .bind(user_id)
            .bind(source_hash)
            .bind(since)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to look up recent submissions: {}",
                    e
                )))
            })?;

        Ok(submission)
    }

    /// Earliest published submission of a source, other than `exclude`
    pub async fn find_published_by_source_hash(
        &self,
        source_hash: &str,
        exclude: SubmissionId,
    ) -> Result<Option<Submission>> {
        let sql = format!(
            r#"
            SELECT {} FROM submissions
            WHERE source_hash = ? AND status = 'published' AND id != ?
            ORDER BY id ASC
            LIMIT 1
            "#,
            SUBMISSION_COLUMNS
        );

        let submission = sqlx::query_as::<_, Submission>(&sql)
            .bind(source_hash)
            .bind(exclude)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to look up published submissions: {}",
                    e
                )))
            })?;

        Ok(submission)
    }

    /// Most recent submissions of a user, newest first
    pub async fn list_recent_submissions(&self, user_id: i64, limit: u32) -> Result<Vec<Submission>> {
        let sql = format!(
            "SELECT {} FROM submissions WHERE user_id = ? ORDER BY id DESC LIMIT ?",
            SUBMISSION_COLUMNS
        );

        let submissions = sqlx::query_as::<_, Submission>(&sql)
            .bind(user_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to list submissions: {}",
                    e
                )))
            })?;

        Ok(submissions)
    }
}
