//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`webhook`] - Telegram webhook receiver
//! - [`worker`] - Worker trigger
//! - [`queue`] - Queue statistics and job lookup
//! - [`system`] - Health, events, OpenAPI

use crate::db::Job;
use crate::types::{JobId, JobStatus, SubmissionPayload, SubmissionResult, WorkerSummary};
use serde::{Deserialize, Serialize};

mod queue;
mod system;
mod webhook;
mod worker;

pub use queue::*;
pub use system::*;
pub use webhook::*;
pub use worker::*;

/// Query parameters for /worker/run
#[derive(Debug, Default, Deserialize, Serialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WorkerRunQuery {
    /// Jobs to claim (clamped to 1..=queue.max_batch; default queue.default_batch)
    pub limit: Option<u32>,
    /// Worker secret, as an alternative to the Bearer token
    pub token: Option<String>,
}

/// Response for /worker/run
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WorkerRunResponse {
    /// Always true for a completed run
    pub ok: bool,
    /// Counts of the run
    #[serde(flatten)]
    pub summary: WorkerSummary,
}

/// Acknowledgement returned to Telegram
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WebhookAck {
    /// Whether the update was accepted
    pub ok: bool,
    /// Reason for a rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for GET /jobs/:id
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobResponse {
    /// Job ID
    pub id: JobId,
    /// Current status
    pub status: JobStatus,
    /// Claims made so far
    pub attempt_count: i64,
    /// Attempts allowed
    pub max_attempts: i64,
    /// Earliest claim time (Unix ms)
    pub available_at: i64,
    /// End of the current lease (Unix ms)
    pub lease_expires_at: Option<i64>,
    /// Error of the most recent failed attempt
    pub last_error: Option<String>,
    /// Decoded payload; absent when it cannot be decoded
    pub payload: Option<SubmissionPayload>,
    /// Result of a completed job
    pub result: Option<SubmissionResult>,
    /// Creation time (Unix ms)
    pub created_at: i64,
    /// Last status change (Unix ms)
    pub updated_at: i64,
    /// Completion time (Unix ms)
    pub completed_at: Option<i64>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            status: job.status(),
            payload: job.payload().ok(),
            result: job.result().ok().flatten(),
            id: job.id,
            attempt_count: job.attempt_count,
            max_attempts: job.max_attempts,
            available_at: job.available_at,
            lease_expires_at: job.lease_expires_at,
            last_error: job.last_error,
            created_at: job.created_at,
            updated_at: job.updated_at,
            completed_at: job.completed_at,
        }
    }
}
