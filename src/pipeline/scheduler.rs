//! Internal scheduler: periodic worker runs and housekeeping
//!
//! Deployments with an external cron hitting `/worker/run` leave
//! `worker.poll_interval` unset; the housekeeping loop always runs.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use super::Pipeline;

/// Processed webhook updates older than this are forgotten
const WEBHOOK_UPDATE_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Completed and failed jobs older than this are deleted
const FINISHED_JOB_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Counts from one housekeeping pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HousekeepingReport {
    /// Pending selections removed after their TTL
    pub expired_drafts: u64,
    /// Webhook update ids forgotten
    pub purged_updates: u64,
    /// Finished jobs deleted
    pub purged_jobs: u64,
}

impl Pipeline {
    /// Sweep expired drafts and purge old bookkeeping rows
    pub async fn run_housekeeping(&self) -> Result<HousekeepingReport> {
        let report = HousekeepingReport {
            expired_drafts: self.db.sweep_expired_pending(self.config.pending.ttl).await?,
            purged_updates: self
                .db
                .purge_webhook_updates(WEBHOOK_UPDATE_RETENTION)
                .await?,
            purged_jobs: self.db.purge_finished_jobs(FINISHED_JOB_RETENTION).await?,
        };

        if report != HousekeepingReport::default() {
            tracing::debug!(
                expired_drafts = report.expired_drafts,
                purged_updates = report.purged_updates,
                purged_jobs = report.purged_jobs,
                "Housekeeping pass"
            );
        }

        Ok(report)
    }

    /// Spawn the background loops; they stop when `cancel` fires
    ///
    /// - a worker run every `worker.poll_interval`, when configured
    /// - housekeeping every `pending.sweep_interval`
    pub fn start_background_tasks(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(2);

        if let Some(poll_interval) = self.config.worker.poll_interval {
            let pipeline = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                tracing::info!(interval_secs = poll_interval.as_secs(), "Worker scheduler started");
                let mut interval = tokio::time::interval(poll_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = interval.tick() => {
                            if let Err(e) = pipeline.run_worker(None).await {
                                tracing::error!(error = %e, "Scheduled worker run failed");
                            }
                        }
                    }
                }
                tracing::info!("Worker scheduler stopped");
            }));
        }

        let pipeline = self.clone();
        let sweep_interval = self.config.pending.sweep_interval;
        handles.push(tokio::spawn(async move {
            tracing::info!(interval_secs = sweep_interval.as_secs(), "Housekeeping started");
            let mut interval = tokio::time::interval(sweep_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = pipeline.run_housekeeping().await {
                            tracing::warn!(error = %e, "Housekeeping failed");
                        }
                    }
                }
            }
            tracing::info!("Housekeeping stopped");
        }));

        handles
    }
}
