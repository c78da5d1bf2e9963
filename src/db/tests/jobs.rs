use super::*;
use crate::types::{JobStatus, LanguageOutcome, SubmissionId, SubmissionResult};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const LEASE: Duration = Duration::from_secs(300);

fn sample_result() -> SubmissionResult {
    SubmissionResult {
        submission_id: SubmissionId(1),
        title: "Example".to_string(),
        outcomes: vec![LanguageOutcome {
            language: Language::En,
            slug: "example-en".to_string(),
            url: "https://example.com/en/article/example-en".to_string(),
        }],
        duration_ms: 10,
        success: true,
        duplicate: false,
        stages: Vec::new(),
    }
}

#[tokio::test]
async fn test_enqueue_and_get_job() {
    let (db, _temp_file) = test_db().await;
    let payload = sample_payload("https://example.com/a");

    let id = db.enqueue_job(&payload, 3).await.unwrap();
    let job = db.get_job(id).await.unwrap().unwrap();

    assert_eq!(job.status(), JobStatus::Pending);
    assert_eq!(job.attempt_count, 0);
    assert_eq!(job.max_attempts, 3);
    assert!(job.lease_expires_at.is_none());
    assert_eq!(job.payload().unwrap(), payload);

    db.close().await;
}

#[tokio::test]
async fn test_claim_sets_lease_and_increments_attempts() {
    let (db, _temp_file) = test_db().await;
    let first = db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();
    let second = db.enqueue_job(&sample_payload("https://example.com/b"), 3).await.unwrap();

    let claimed = db.claim_pending_jobs(10, LEASE).await.unwrap();
    assert_eq!(claimed.len(), 2);
    assert_eq!(claimed[0].id, first, "oldest job first");
    assert_eq!(claimed[1].id, second);
    for job in &claimed {
        assert_eq!(job.status(), JobStatus::Claimed);
        assert_eq!(job.attempt_count, 1);
        assert!(job.lease_expires_at.unwrap() > crate::utils::now_millis());
    }

    db.close().await;
}

#[tokio::test]
async fn test_claim_respects_limit() {
    let (db, _temp_file) = test_db().await;
    for i in 0..5 {
        db.enqueue_job(&sample_payload(&format!("https://example.com/{i}")), 3)
            .await
            .unwrap();
    }

    assert_eq!(db.claim_pending_jobs(2, LEASE).await.unwrap().len(), 2);
    assert_eq!(db.claim_pending_jobs(0, LEASE).await.unwrap().len(), 0);
    assert_eq!(db.queue_stats().await.unwrap().pending, 3);

    db.close().await;
}

#[tokio::test]
async fn test_claim_skips_jobs_with_valid_lease() {
    let (db, _temp_file) = test_db().await;
    db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();

    assert_eq!(db.claim_pending_jobs(5, LEASE).await.unwrap().len(), 1);
    assert!(
        db.claim_pending_jobs(5, LEASE).await.unwrap().is_empty(),
        "a job under a valid lease must not be claimed again"
    );

    db.close().await;
}

#[tokio::test]
async fn test_claim_takes_over_expired_lease() {
    let (db, _temp_file) = test_db().await;
    let id = db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();

    let first = db.claim_pending_jobs(1, Duration::ZERO).await.unwrap();
    assert_eq!(first.len(), 1);
    tokio::time::sleep(Duration::from_millis(5)).await;

    let second = db.claim_pending_jobs(1, LEASE).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, id);
    assert_eq!(second[0].attempt_count, 2);

    db.close().await;
}

#[tokio::test]
async fn test_concurrent_claims_never_share_a_job() {
    let (db, _temp_file) = test_db().await;
    for i in 0..20 {
        db.enqueue_job(&sample_payload(&format!("https://example.com/{i}")), 3)
            .await
            .unwrap();
    }
    let db = Arc::new(db);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.claim_pending_jobs(3, LEASE).await.unwrap()
        }));
    }

    let mut seen = HashSet::new();
    let mut total = 0;
    for handle in handles {
        for job in handle.await.unwrap() {
            total += 1;
            assert!(seen.insert(job.id), "job {} claimed twice", job.id);
        }
    }
    assert_eq!(total, 20);
    assert_eq!(db.queue_stats().await.unwrap().claimed, 20);
}

#[tokio::test]
async fn test_complete_job_is_idempotent() {
    let (db, _temp_file) = test_db().await;
    let id = db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();
    db.claim_pending_jobs(1, LEASE).await.unwrap();

    let result = sample_result();
    assert!(db.complete_job(id, &result).await.unwrap());
    assert!(!db.complete_job(id, &result).await.unwrap());

    let job = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status(), JobStatus::Completed);
    assert!(job.completed_at.is_some());
    assert_eq!(job.result().unwrap(), Some(result));

    db.close().await;
}

#[tokio::test]
async fn test_complete_requires_claim() {
    let (db, _temp_file) = test_db().await;
    let id = db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();

    assert!(!db.complete_job(id, &sample_result()).await.unwrap());
    assert_eq!(db.get_job(id).await.unwrap().unwrap().status(), JobStatus::Pending);

    db.close().await;
}

#[tokio::test]
async fn test_fail_job_requeues_until_exhausted() {
    let (db, _temp_file) = test_db().await;
    let id = db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();

    for attempt in 1..=2u32 {
        let job = db.claim_pending_jobs(1, LEASE).await.unwrap().remove(0);
        let outcome = db.fail_job(&job, "upstream 503", Duration::ZERO).await.unwrap();
        assert!(outcome.retried);
        assert!(outcome.applied);
        assert_eq!(outcome.attempt_count, attempt);
        assert_eq!(outcome.max_attempts, 3);

        let stored = db.get_job(id).await.unwrap().unwrap();
        assert_eq!(stored.status(), JobStatus::Pending);
        assert_eq!(stored.last_error.as_deref(), Some("upstream 503"));
        assert!(stored.lease_expires_at.is_none());
    }

    let job = db.claim_pending_jobs(1, LEASE).await.unwrap().remove(0);
    let outcome = db.fail_job(&job, "upstream 503", Duration::ZERO).await.unwrap();
    assert!(!outcome.retried);
    assert_eq!(outcome.attempt_count, 3);

    let stored = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(stored.status(), JobStatus::Failed);
    assert!(db.claim_pending_jobs(1, LEASE).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_fail_job_backoff_delays_reclaim() {
    let (db, _temp_file) = test_db().await;
    let id = db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();

    let job = db.claim_pending_jobs(1, LEASE).await.unwrap().remove(0);
    db.fail_job(&job, "timeout", Duration::from_secs(60)).await.unwrap();

    assert!(db.claim_pending_jobs(1, LEASE).await.unwrap().is_empty());
    let stored = db.get_job(id).await.unwrap().unwrap();
    assert!(stored.available_at > crate::utils::now_millis() + 50_000);

    db.close().await;
}

#[tokio::test]
async fn test_fail_job_with_superseded_claim_is_ignored() {
    let (db, _temp_file) = test_db().await;
    db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();

    let stale = db.claim_pending_jobs(1, Duration::ZERO).await.unwrap().remove(0);
    tokio::time::sleep(Duration::from_millis(5)).await;
    let current = db.claim_pending_jobs(1, LEASE).await.unwrap().remove(0);

    let outcome = db.fail_job(&stale, "late failure", Duration::ZERO).await.unwrap();
    assert!(!outcome.applied);

    let stored = db.get_job(current.id).await.unwrap().unwrap();
    assert_eq!(stored.status(), JobStatus::Claimed);
    assert_eq!(stored.attempt_count, 2);
    assert!(stored.last_error.is_none());

    db.close().await;
}

#[tokio::test]
async fn test_fail_job_permanently() {
    let (db, _temp_file) = test_db().await;
    let id = db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();

    let job = db.claim_pending_jobs(1, LEASE).await.unwrap().remove(0);
    assert!(db.fail_job_permanently(&job, "text too short").await.unwrap());

    let stored = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(stored.status(), JobStatus::Failed);
    assert_eq!(stored.attempt_count, 1);

    db.close().await;
}

#[tokio::test]
async fn test_recycle_stale_jobs() {
    let (db, _temp_file) = test_db().await;
    let retryable = db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();
    let exhausted = db.enqueue_job(&sample_payload("https://example.com/b"), 1).await.unwrap();
    let done = db.enqueue_job(&sample_payload("https://example.com/c"), 3).await.unwrap();

    db.claim_pending_jobs(10, Duration::ZERO).await.unwrap();
    assert!(db.complete_job(done, &sample_result()).await.unwrap());
    tokio::time::sleep(Duration::from_millis(5)).await;

    let sweep = db.recycle_stale_jobs(50).await.unwrap();
    assert_eq!(sweep.requeued, 1);
    assert_eq!(sweep.failed.len(), 1);
    assert_eq!(sweep.failed[0].id, exhausted);
    assert_eq!(sweep.failed[0].status(), JobStatus::Failed);
    assert!(sweep.failed[0].payload().unwrap().url.is_some());

    assert_eq!(db.get_job(retryable).await.unwrap().unwrap().status(), JobStatus::Pending);
    assert_eq!(db.get_job(exhausted).await.unwrap().unwrap().status(), JobStatus::Failed);
    assert_eq!(
        db.get_job(done).await.unwrap().unwrap().status(),
        JobStatus::Completed,
        "completed jobs are never reopened"
    );

    let again = db.recycle_stale_jobs(50).await.unwrap();
    assert_eq!(again.report(), crate::types::StaleRecycleReport::default());

    db.close().await;
}

#[tokio::test]
async fn test_recycle_leaves_valid_leases_alone() {
    let (db, _temp_file) = test_db().await;
    let id = db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();
    db.claim_pending_jobs(1, LEASE).await.unwrap();

    let sweep = db.recycle_stale_jobs(50).await.unwrap();
    assert_eq!(sweep.requeued, 0);
    assert!(sweep.failed.is_empty());
    assert_eq!(db.get_job(id).await.unwrap().unwrap().status(), JobStatus::Claimed);

    db.close().await;
}

#[tokio::test]
async fn test_release_job_gives_back_the_attempt() {
    let (db, _temp_file) = test_db().await;
    let id = db.enqueue_job(&sample_payload("https://example.com/a"), 1).await.unwrap();
    let claimed = db.claim_pending_jobs(1, LEASE).await.unwrap();
    assert_eq!(claimed[0].attempt_count, 1);

    assert!(db.release_job(&claimed[0]).await.unwrap());
    assert!(
        !db.release_job(&claimed[0]).await.unwrap(),
        "a released claim cannot be released twice"
    );

    let stored = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(stored.status(), JobStatus::Pending);
    assert_eq!(stored.attempt_count, 0);

    let again = db.claim_pending_jobs(1, LEASE).await.unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].attempt_count, 1);

    db.close().await;
}

#[tokio::test]
async fn test_list_jobs_and_stats() {
    let (db, _temp_file) = test_db().await;
    let a = db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();
    db.enqueue_job(&sample_payload("https://example.com/b"), 3).await.unwrap();
    db.claim_pending_jobs(1, LEASE).await.unwrap();
    db.complete_job(a, &sample_result()).await.unwrap();

    let all = db.list_jobs(None, 10).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[0].id > all[1].id, "newest first");

    let completed = db.list_jobs(Some(JobStatus::Completed), 10).await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, a);

    let stats = db.queue_stats().await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.claimed, 0);
    assert_eq!(stats.failed, 0);

    db.close().await;
}

#[tokio::test]
async fn test_purge_finished_jobs() {
    let (db, _temp_file) = test_db().await;
    let done = db.enqueue_job(&sample_payload("https://example.com/a"), 3).await.unwrap();
    let waiting = db.enqueue_job(&sample_payload("https://example.com/b"), 3).await.unwrap();
    db.claim_pending_jobs(1, LEASE).await.unwrap();
    db.complete_job(done, &sample_result()).await.unwrap();

    assert_eq!(db.purge_finished_jobs(Duration::from_secs(3600)).await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(db.purge_finished_jobs(Duration::ZERO).await.unwrap(), 1);
    assert!(db.get_job(done).await.unwrap().is_none());
    assert!(db.get_job(waiting).await.unwrap().is_some());

    db.close().await;
}
