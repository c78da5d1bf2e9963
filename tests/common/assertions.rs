//! Helpers for inspecting what the pipeline did

use std::time::Duration;
use submission_pipeline::{Event, Pipeline};
use wiremock::MockServer;

/// A Bot API call captured by the mock
#[derive(Debug, Clone)]
pub struct BotCall {
    /// Bot API method, e.g. `sendMessage`
    pub method: String,
    /// JSON body of the call
    pub body: serde_json::Value,
}

impl BotCall {
    /// Message text, for send and edit calls
    pub fn text(&self) -> &str {
        self.body["text"].as_str().unwrap_or_default()
    }
}

/// Every Bot API call received so far, in order
pub async fn bot_calls(server: &MockServer) -> Vec<BotCall> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| BotCall {
            method: request
                .url
                .path()
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string(),
            body: serde_json::from_slice(&request.body).unwrap_or_default(),
        })
        .collect()
}

/// Texts of sent and edited messages, in order
pub async fn bot_texts(server: &MockServer) -> Vec<String> {
    bot_calls(server)
        .await
        .into_iter()
        .filter(|c| c.method == "sendMessage" || c.method == "editMessageText")
        .map(|c| c.text().to_string())
        .collect()
}

/// Wait for an event matching `predicate`
///
/// Subscribe before triggering the work; returns None on timeout.
pub async fn wait_for_event<F>(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    timeout: Duration,
    predicate: F,
) -> Option<Event>
where
    F: Fn(&Event) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return Some(event),
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

/// Assert a job's status and attempt count
pub async fn assert_job_state(
    pipeline: &Pipeline,
    job_id: submission_pipeline::JobId,
    status: submission_pipeline::JobStatus,
    attempts: i64,
) {
    let job = pipeline
        .db
        .get_job(job_id)
        .await
        .expect("query job")
        .expect("job exists");
    assert_eq!(job.status(), status, "job {} status", job_id);
    assert_eq!(job.attempt_count, attempts, "job {} attempts", job_id);
}
