use super::*;
use crate::pipeline::test_helpers::*;
use crate::types::{JobStatus, Language, SubmissionStatus};


/// Request for a single URL from user 10 in chat 1
fn url_request(url: &str) -> SubmissionRequest {
    SubmissionRequest {
        chat_id: 1,
        user_id: 10,
        username: Some("tester".to_string()),
        url: Some(url.to_string()),
        ..Default::default()
    }
}

/// Enqueue and return the job id, failing the test on any other outcome
async fn enqueue_url(pipeline: &Pipeline, url: &str, user_id: i64) -> crate::types::JobId {
    let request = SubmissionRequest {
        user_id,
        ..url_request(url)
    };
    match pipeline.enqueue_submission(request).await.unwrap() {
        EnqueueOutcome::Queued { job_id, .. } => job_id,
        other => panic!("expected Queued, got {:?}", other),
    }
}
