//! Lease-based job queue.
//!
//! Every state transition is a single conditional `UPDATE`, so concurrent
//! worker runs coordinate only through the table.

use crate::error::DatabaseError;
use crate::types::{
    FailOutcome, JobId, JobStatus, QueueStats, SubmissionPayload, SubmissionResult,
};
use crate::utils::now_millis;
use crate::{Error, Result};
use std::time::Duration;

use super::{Database, Job, StaleSweep};

const JOB_COLUMNS: &str = "id, payload, status, attempt_count, max_attempts, lease_expires_at, \
     available_at, last_error, result, created_at, updated_at, completed_at";

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

impl Database {
    /// Insert a pending job
    pub async fn enqueue_job(&self, payload: &SubmissionPayload, max_attempts: u32) -> Result<JobId> {
        let payload_json = serde_json::to_string(payload)?;
        let now = now_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (
                payload, status, attempt_count, max_attempts,
                available_at, created_at, updated_at
            ) VALUES (?, 'pending', 0, ?, ?, ?, ?)
            "#,
        )
        .bind(&payload_json)
        .bind(i64::from(max_attempts))
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to enqueue job: {}",
                e
            )))
        })?;

        Ok(JobId(result.last_insert_rowid()))
    }

    /// Lease up to `limit` claimable jobs, oldest first
    ///
    /// A job is claimable when it is pending and its backoff has elapsed, or when
    /// it is claimed under an expired lease and still has attempts left. The
    /// select and the update run as one statement, so two callers never receive
    /// the same job.
    pub async fn claim_pending_jobs(&self, limit: u32, lease: Duration) -> Result<Vec<Job>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let now = now_millis();
        let lease_expires_at = now.saturating_add(millis(lease));

        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'claimed',
                attempt_count = attempt_count + 1,
                lease_expires_at = ?,
                updated_at = ?
            WHERE id IN (
                SELECT id FROM jobs
                WHERE (status = 'pending' AND available_at <= ?)
                   OR (status = 'claimed' AND lease_expires_at <= ? AND attempt_count < max_attempts)
                ORDER BY available_at ASC, id ASC
                LIMIT ?
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let mut jobs = sqlx::query_as::<_, Job>(&sql)
            .bind(lease_expires_at)
            .bind(now)
            .bind(now)
            .bind(now)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to claim jobs: {}",
                    e
                )))
            })?;

        // RETURNING order is unspecified
        jobs.sort_by_key(|j| (j.created_at, j.id));
        Ok(jobs)
    }

    /// Mark a claimed job completed and store its result
    ///
    /// Returns false when the job is no longer claimed, which makes repeated
    /// calls harmless.
    pub async fn complete_job(&self, id: JobId, result: &SubmissionResult) -> Result<bool> {
        let result_json = serde_json::to_string(result)?;
        let now = now_millis();

        let outcome = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed',
                result = ?,
                lease_expires_at = NULL,
                completed_at = ?,
                updated_at = ?
            WHERE id = ? AND status = 'claimed'
            "#,
        )
        .bind(&result_json)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to complete job: {}",
                e
            )))
        })?;

        Ok(outcome.rows_affected() > 0)
    }

    /// Record a failed attempt
    ///
    /// With attempts left the job goes back to pending, claimable after
    /// `retry_delay`; otherwise it fails for good. The update only applies to
    /// the claim described by `job`, so a worker whose lease was taken over
    /// cannot overwrite the newer attempt.
    pub async fn fail_job(&self, job: &Job, error: &str, retry_delay: Duration) -> Result<FailOutcome> {
        let now = now_millis();
        let retried = job.has_attempts_left();

        let outcome = if retried {
            sqlx::query(
                r#"
                UPDATE jobs
                SET status = 'pending',
                    lease_expires_at = NULL,
                    available_at = ?,
                    last_error = ?,
                    updated_at = ?
                WHERE id = ? AND status = 'claimed' AND attempt_count = ?
                "#,
            )
            .bind(now.saturating_add(millis(retry_delay)))
            .bind(error)
            .bind(now)
            .bind(job.id)
            .bind(job.attempt_count)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE jobs
                SET status = 'failed',
                    lease_expires_at = NULL,
                    last_error = ?,
                    completed_at = ?,
                    updated_at = ?
                WHERE id = ? AND status = 'claimed' AND attempt_count = ?
                "#,
            )
            .bind(error)
            .bind(now)
            .bind(now)
            .bind(job.id)
            .bind(job.attempt_count)
            .execute(&self.pool)
            .await
        }
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to record job failure: {}",
                e
            )))
        })?;

        Ok(FailOutcome {
            retried,
            applied: outcome.rows_affected() > 0,
            attempt_count: u32::try_from(job.attempt_count).unwrap_or(u32::MAX),
            max_attempts: u32::try_from(job.max_attempts).unwrap_or(u32::MAX),
        })
    }

    /// Fail a claimed job regardless of remaining attempts
    pub async fn fail_job_permanently(&self, job: &Job, error: &str) -> Result<bool> {
        let now = now_millis();

        let outcome = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                lease_expires_at = NULL,
                last_error = ?,
                completed_at = ?,
                updated_at = ?
            WHERE id = ? AND status = 'claimed' AND attempt_count = ?
            "#,
        )
        .bind(error)
        .bind(now)
        .bind(now)
        .bind(job.id)
        .bind(job.attempt_count)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to fail job: {}",
                e
            )))
        })?;

        Ok(outcome.rows_affected() > 0)
    }

    /// Recover claimed jobs whose lease expired
    ///
    /// Jobs with attempts left return to pending and are immediately claimable;
    /// exhausted jobs fail and are returned so the caller can finish their
    /// submissions. Completed and failed rows are never touched.
    pub async fn recycle_stale_jobs(&self, limit: u32) -> Result<StaleSweep> {
        let now = now_millis();

        let requeued = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'pending',
                lease_expires_at = NULL,
                available_at = ?,
                last_error = COALESCE(last_error, 'lease expired'),
                updated_at = ?
            WHERE id IN (
                SELECT id FROM jobs
                WHERE status = 'claimed'
                  AND lease_expires_at <= ?
                  AND attempt_count < max_attempts
                ORDER BY lease_expires_at ASC
                LIMIT ?
            )
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(now)
        .bind(i64::from(limit))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to requeue stale jobs: {}",
                e
            )))
        })?
        .rows_affected();

        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'failed',
                lease_expires_at = NULL,
                last_error = 'lease expired after final attempt',
                completed_at = ?,
                updated_at = ?
            WHERE id IN (
                SELECT id FROM jobs
                WHERE status = 'claimed'
                  AND lease_expires_at <= ?
                  AND attempt_count >= max_attempts
                ORDER BY lease_expires_at ASC
                LIMIT ?
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let mut failed = sqlx::query_as::<_, Job>(&sql)
            .bind(now)
            .bind(now)
            .bind(now)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to fail stale jobs: {}",
                    e
                )))
            })?;
        failed.sort_by_key(|j| j.id);

        Ok(StaleSweep {
            requeued: u32::try_from(requeued).unwrap_or(u32::MAX),
            failed,
        })
    }

    /// Return a claimed job that never started to pending
    ///
    /// The claim's attempt is given back, so an unstarted job does not use up
    /// its attempts. Returns false when the claim was already taken over.
    pub async fn release_job(&self, job: &Job) -> Result<bool> {
        let now = now_millis();

        let outcome = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'pending',
                attempt_count = MAX(attempt_count - 1, 0),
                lease_expires_at = NULL,
                available_at = ?,
                updated_at = ?
            WHERE id = ? AND status = 'claimed' AND attempt_count = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(job.id)
        .bind(job.attempt_count)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to release job: {}",
                e
            )))
        })?;

        Ok(outcome.rows_affected() > 0)
    }

    /// Get a job by ID
    pub async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let sql = format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS);
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get job: {}",
                    e
                )))
            })?;

        Ok(job)
    }

    /// List jobs, newest first, optionally filtered by status
    pub async fn list_jobs(&self, status: Option<JobStatus>, limit: u32) -> Result<Vec<Job>> {
        let jobs = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM jobs WHERE status = ? ORDER BY id DESC LIMIT ?",
                    JOB_COLUMNS
                );
                sqlx::query_as::<_, Job>(&sql)
                    .bind(status.as_str())
                    .bind(i64::from(limit))
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!("SELECT {} FROM jobs ORDER BY id DESC LIMIT ?", JOB_COLUMNS);
                sqlx::query_as::<_, Job>(&sql)
                    .bind(i64::from(limit))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list jobs: {}",
                e
            )))
        })?;

        Ok(jobs)
    }

    /// Count jobs per status
    pub async fn queue_stats(&self) -> Result<QueueStats> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM jobs GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to count jobs: {}",
                        e
                    )))
                })?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            let count = u64::try_from(count).unwrap_or(0);
            match JobStatus::from_db(&status) {
                JobStatus::Pending => stats.pending = count,
                JobStatus::Claimed => stats.claimed = count,
                JobStatus::Completed => stats.completed = count,
                JobStatus::Failed => stats.failed += count,
            }
        }

        Ok(stats)
    }

    /// Delete completed and failed jobs that finished more than `older_than` ago
    pub async fn purge_finished_jobs(&self, older_than: Duration) -> Result<u64> {
        let cutoff = now_millis().saturating_sub(millis(older_than));

        let result = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE status IN ('completed', 'failed')
              AND completed_at IS NOT NULL
              AND completed_at < ?
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to purge finished jobs: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }
}
