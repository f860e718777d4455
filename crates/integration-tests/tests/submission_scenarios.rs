// Scenario 1 (happy path) and scenario 2 (idempotent resubmit), run
// against a real SQLite-backed PS and the in-memory CS.

mod support;

use std::sync::Arc;

use testorch_core::application::{
    DispatchService, SchedulerConfig, SchedulerLoop, SubmissionService, SubmitRequest,
};
use testorch_core::domain::{JobOutcome, JobStatus};
use testorch_core::error::AppError;
use testorch_core::port::JobRepository;
use testorch_infra_coordination::InMemoryCoordinationStore;

use support::{job_repo, temp_db, FakeTimeProvider, SeqIdProvider};

fn submit_request(token: &str) -> SubmitRequest {
    SubmitRequest {
        org: "o1".to_string(),
        artifact: Some("v1".to_string()),
        web_url: None,
        test_path: "a.spec".to_string(),
        priority: 5,
        target: "emulator".to_string(),
        test_kind: None,
        idempotency_token: Some(token.to_string()),
    }
}

#[tokio::test]
async fn happy_path_submit_schedule_fetch_complete() {
    let db = temp_db().await;
    let repo = job_repo(&db);
    let coordination = Arc::new(InMemoryCoordinationStore::default());
    let ids = Arc::new(SeqIdProvider::new("id"));
    let time = Arc::new(FakeTimeProvider::new(1_000));

    let submission = SubmissionService::new(repo.clone(), coordination.clone(), ids.clone(), time.clone());
    let dispatch = DispatchService::new(repo.clone(), coordination.clone(), ids.clone(), time.clone());
    let scheduler = SchedulerLoop::new(repo.clone(), coordination.clone(), ids.clone(), time.clone(), SchedulerConfig::default());

    let submitted = submission.submit(submit_request("t1")).await.unwrap();
    assert_eq!(submitted.status, JobStatus::Pending);

    scheduler.tick().await.unwrap();
    let scheduled = submission.get_status(&submitted.job_id).await.unwrap();
    assert_eq!(scheduled.status, JobStatus::Scheduled);
    assert!(scheduled.group_id.is_some());

    let assigned = dispatch.fetch_job("emulator").await.unwrap();
    assert_eq!(assigned.id, submitted.job_id);
    assert_eq!(assigned.status, JobStatus::Assigned);

    dispatch
        .update_job_status(&submitted.job_id, JobStatus::Running, None, None)
        .await
        .unwrap();
    dispatch
        .update_job_status(
            &submitted.job_id,
            JobStatus::Completed,
            None,
            Some(JobOutcome {
                session_id: Some("sess-1".to_string()),
                duration_seconds: Some(42),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

    let done = submission.get_status(&submitted.job_id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    let outcome = done.outcome.unwrap();
    assert_eq!(outcome.session_id.as_deref(), Some("sess-1"));
    assert_eq!(outcome.duration_seconds, Some(42));
}

#[tokio::test]
async fn idempotent_resubmit_is_rejected_and_ps_has_one_row() {
    let db = temp_db().await;
    let repo = job_repo(&db);
    let coordination = Arc::new(InMemoryCoordinationStore::default());
    let ids = Arc::new(SeqIdProvider::new("id"));
    let time = Arc::new(FakeTimeProvider::new(1_000));

    let submission = SubmissionService::new(repo.clone(), coordination.clone(), ids.clone(), time.clone());

    let first = submission.submit(submit_request("t2")).await.unwrap();
    assert_eq!(first.status, JobStatus::Pending);

    let second = submission.submit(submit_request("t2")).await;
    assert!(matches!(second, Err(AppError::AlreadyExists(_))));

    // Exactly one row: the surviving job is reachable and unique.
    let row = repo.get_job(&first.job_id).await.unwrap();
    assert!(row.is_some());

    let pending = repo.get_pending_jobs(100).await.unwrap();
    assert_eq!(pending.iter().filter(|j| j.idempotency_token.as_deref() == Some("t2")).count(), 1);
}
