//! Queue worker: one bounded batch run over the job queue.
//!
//! A run recycles expired leases, claims up to N jobs, and processes them one
//! after another inside a wall-clock budget. Each job runs in its own task so a
//! panic stays contained, and each job ends in exactly one terminal queue call.

use crate::db::Job;
use crate::error::{Error, Result};
use crate::retry::{IsRetryable, backoff_delay, with_timeout};
use crate::types::{
    Event, Language, LanguageOutcome, SubmissionId, SubmissionPayload, SubmissionResult,
    WorkerSummary,
};
use std::time::{Duration, Instant};

use super::Pipeline;
use super::messages::Messages;

/// How a claimed job left the run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum JobOutcome {
    /// Completed, including duplicates
    Completed,
    /// Back to pending for another attempt
    Retried,
    /// Failed for good
    Failed,
    /// Another run moved the job on first; nothing recorded
    Superseded,
}

impl Pipeline {
    /// Run one worker batch
    ///
    /// `limit` is clamped to `1..=queue.max_batch` and defaults to
    /// `queue.default_batch`. Jobs that cannot start before `worker.time_budget`
    /// runs out go back to pending without using up an attempt. Jobs whose
    /// lease expired on their last attempt are failed by the stale sweep and
    /// their submissions finished here.
    ///
    /// # Errors
    ///
    /// Only queue-level failures (stale sweep or claim) abort the run. Errors of
    /// individual jobs are recorded on the job and counted in the summary.
    pub async fn run_worker(&self, limit: Option<u32>) -> Result<WorkerSummary> {
        let started = Instant::now();
        let queue = &self.config.queue;
        let deadline = started + self.config.worker.time_budget;
        let limit = limit
            .unwrap_or(queue.default_batch)
            .clamp(1, queue.max_batch.max(1));

        let mut summary = WorkerSummary::default();

        let sweep = self.db.recycle_stale_jobs(queue.stale_scan_limit).await?;
        let stale = sweep.report();
        summary.stale_requeued = stale.requeued;
        summary.stale_failed = stale.failed;
        if stale.requeued > 0 || stale.failed > 0 {
            tracing::info!(
                requeued = stale.requeued,
                failed = stale.failed,
                "Recycled stale jobs"
            );
            self.emit_event(Event::StaleJobsRecycled {
                requeued: stale.requeued,
                failed: stale.failed,
            });
        }

        for job in &sweep.failed {
            if let Err(e) = self.finish_stale_failed(job).await {
                tracing::error!(job_id = %job.id, error = %e, "Failed to finish stale job");
            }
        }

        let jobs = self
            .db
            .claim_pending_jobs(limit, queue.lease_duration)
            .await?;
        summary.claimed = jobs.len() as u32;

        for job in jobs {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                if self.db.release_job(&job).await? {
                    tracing::info!(job_id = %job.id, "Time budget exhausted, job released for a later run");
                } else {
                    tracing::warn!(job_id = %job.id, "Deferred job was already taken over");
                }
                summary.deferred += 1;
                continue;
            }

            tracing::info!(job_id = %job.id, attempt = job.attempt_count, "Job claimed");
            self.emit_event(Event::JobClaimed {
                job_id: job.id,
                attempt: job.attempt_count as u32,
            });

            let timeout = self.config.worker.job_timeout.min(remaining);
            match self.run_job(job, timeout).await {
                Ok(JobOutcome::Completed) => summary.completed += 1,
                Ok(JobOutcome::Retried) => summary.retried += 1,
                Ok(JobOutcome::Failed) => summary.failed += 1,
                Ok(JobOutcome::Superseded) => {}
                Err(e) => {
                    // The claim stays in place; the stale sweep recovers it
                    tracing::error!(error = %e, "Failed to record job outcome");
                }
            }
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        summary.timestamp = chrono::Utc::now().to_rfc3339();

        tracing::info!(
            claimed = summary.claimed,
            completed = summary.completed,
            retried = summary.retried,
            failed = summary.failed,
            deferred = summary.deferred,
            duration_ms = summary.duration_ms,
            "Worker run finished"
        );

        Ok(summary)
    }

    /// Process one claimed job in its own task and record the outcome
    async fn run_job(&self, job: Job, timeout: Duration) -> Result<JobOutcome> {
        let mut payload = match job.payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Undecodable job payload");
                let applied = self
                    .db
                    .fail_job_permanently(&job, &format!("invalid payload: {}", e))
                    .await?;
                if applied {
                    self.emit_event(Event::JobFailed {
                        job_id: job.id,
                        error: e.to_string(),
                    });
                    return Ok(JobOutcome::Failed);
                }
                return Ok(JobOutcome::Superseded);
            }
        };

        let result = match self.ensure_submission(&mut payload).await {
            Ok(_) => self.spawn_processing(&job, &payload, timeout).await,
            Err(e) => Err(e),
        };

        self.record_outcome(&job, &payload, result).await
    }

    async fn spawn_processing(
        &self,
        job: &Job,
        payload: &SubmissionPayload,
        timeout: Duration,
    ) -> Result<SubmissionResult> {
        let pipeline = self.clone();
        let task_job = job.clone();
        let task_payload = payload.clone();

        let handle = tokio::spawn(async move {
            with_timeout(
                timeout,
                "submission job",
                pipeline.process_job(&task_job, task_payload),
            )
            .await
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::Other(format!("job task panicked: {}", e))),
        }
    }

    async fn record_outcome(
        &self,
        job: &Job,
        payload: &SubmissionPayload,
        result: Result<SubmissionResult>,
    ) -> Result<JobOutcome> {
        let messages = Messages::new(payload.interface_language);

        match result {
            Ok(result) => {
                if self.db.complete_job(job.id, &result).await? {
                    tracing::info!(job_id = %job.id, submission_id = %result.submission_id, "Job completed");
                    self.emit_event(Event::JobCompleted {
                        job_id: job.id,
                        result,
                    });
                    Ok(JobOutcome::Completed)
                } else {
                    tracing::warn!(job_id = %job.id, "Job was already finished by another run");
                    Ok(JobOutcome::Superseded)
                }
            }

            Err(Error::Duplicate {
                submission_id: existing,
            }) => {
                let result = self.duplicate_result(existing).await?;
                if !self.db.complete_job(job.id, &result).await? {
                    return Ok(JobOutcome::Superseded);
                }

                if let Some(own) = payload.submission_id {
                    self.db
                        .mark_submission_failed(
                            own,
                            &format!("already published as submission {}", existing),
                        )
                        .await?;
                }

                let urls: Vec<String> = result.outcomes.iter().map(|o| o.url.clone()).collect();
                self.notify(payload.chat_id, &messages.duplicate(&urls), None)
                    .await;

                tracing::info!(job_id = %job.id, existing = %existing, "Job source already published");
                self.emit_event(Event::JobDuplicate {
                    job_id: job.id,
                    existing,
                });
                Ok(JobOutcome::Completed)
            }

            Err(e) if e.is_retryable() => {
                let attempt = job.attempt_count.max(0) as u32;
                let delay = backoff_delay(&self.config.queue.backoff, attempt);
                let outcome = self.db.fail_job(job, &e.to_string(), delay).await?;

                if !outcome.applied {
                    tracing::warn!(job_id = %job.id, "Job failure not recorded, claim superseded");
                    return Ok(JobOutcome::Superseded);
                }

                if outcome.retried {
                    tracing::warn!(
                        job_id = %job.id,
                        attempt = outcome.attempt_count,
                        max_attempts = outcome.max_attempts,
                        retry_in_secs = delay.as_secs(),
                        error = %e,
                        "Job failed, retry scheduled"
                    );
                    self.notify(
                        payload.chat_id,
                        &messages.retry_scheduled(outcome.attempt_count, outcome.max_attempts),
                        None,
                    )
                    .await;
                    self.emit_event(Event::JobRetryScheduled {
                        job_id: job.id,
                        attempt: outcome.attempt_count,
                        max_attempts: outcome.max_attempts,
                        error: e.to_string(),
                    });
                    Ok(JobOutcome::Retried)
                } else {
                    self.finish_failed(job, payload, &e).await?;
                    Ok(JobOutcome::Failed)
                }
            }

            Err(e) => {
                if !self.db.fail_job_permanently(job, &e.to_string()).await? {
                    tracing::warn!(job_id = %job.id, "Job failure not recorded, claim superseded");
                    return Ok(JobOutcome::Superseded);
                }
                self.finish_failed(job, payload, &e).await?;
                Ok(JobOutcome::Failed)
            }
        }
    }

    /// Terminal failure bookkeeping: submission record, final notice, event
    async fn finish_failed(&self, job: &Job, payload: &SubmissionPayload, error: &Error) -> Result<()> {
        tracing::error!(
            job_id = %job.id,
            attempt = job.attempt_count,
            category = ?error.category(),
            error = %error,
            "Job failed permanently"
        );

        if let Some(submission_id) = payload.submission_id {
            self.db
                .mark_submission_failed(submission_id, &error.to_string())
                .await?;
        }

        let messages = Messages::new(payload.interface_language);
        self.notify(payload.chat_id, &messages.failed(error.category()), None)
            .await;

        self.emit_event(Event::JobFailed {
            job_id: job.id,
            error: error.to_string(),
        });
        Ok(())
    }

    /// Terminal bookkeeping for a job the stale sweep failed
    async fn finish_stale_failed(&self, job: &Job) -> Result<()> {
        let payload = match job.payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Undecodable payload on stale job");
                self.emit_event(Event::JobFailed {
                    job_id: job.id,
                    error: e.to_string(),
                });
                return Ok(());
            }
        };

        let error = Error::Timeout {
            operation: "submission job".to_string(),
            after: self.config.queue.lease_duration,
        };
        self.finish_failed(job, &payload, &error).await
    }

    /// Result recorded for a job whose source another submission already published
    async fn duplicate_result(&self, existing: SubmissionId) -> Result<SubmissionResult> {
        let title = self
            .db
            .get_submission(existing)
            .await?
            .and_then(|s| s.title)
            .unwrap_or_default();

        let outcomes = self
            .db
            .list_articles_for_submission(existing)
            .await?
            .into_iter()
            .filter_map(|article| {
                Language::from_code(&article.language).map(|language| LanguageOutcome {
                    language,
                    slug: article.slug,
                    url: article.url,
                })
            })
            .collect();

        Ok(SubmissionResult {
            submission_id: existing,
            title,
            outcomes,
            duration_ms: 0,
            success: true,
            duplicate: true,
            stages: Vec::new(),
        })
    }
}
