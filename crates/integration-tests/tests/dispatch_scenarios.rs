// Scenario 5 (concurrent fetches) and scenario 6 (invalid transition).

mod support;

use std::collections::HashSet;
use std::sync::Arc;

use testorch_core::application::{
    DispatchService, SchedulerConfig, SchedulerLoop, SubmissionService, SubmitRequest,
};
use testorch_core::domain::JobStatus;
use testorch_core::error::AppError;
use testorch_core::port::JobRepository;
use testorch_infra_coordination::InMemoryCoordinationStore;

use support::{job_repo, temp_db, FakeTimeProvider, SeqIdProvider};

fn web_request(n: usize) -> SubmitRequest {
    SubmitRequest {
        org: "o1".to_string(),
        artifact: None,
        web_url: Some(format!("https://example.com/{n}")),
        test_path: "a.spec".to_string(),
        priority: 5,
        target: "web".to_string(),
        test_kind: None,
        idempotency_token: None,
    }
}

#[tokio::test]
async fn concurrent_fetches_claim_disjoint_jobs_exactly_once() {
    let db = temp_db().await;
    let repo = job_repo(&db);
    let coordination = Arc::new(InMemoryCoordinationStore::default());
    let ids = Arc::new(SeqIdProvider::new("id"));
    let time = Arc::new(FakeTimeProvider::new(1_000));

    let submission = SubmissionService::new(repo.clone(), coordination.clone(), ids.clone(), time.clone());
    let scheduler = SchedulerLoop::new(repo.clone(), coordination.clone(), ids.clone(), time.clone(), SchedulerConfig::default());
    let dispatch = Arc::new(DispatchService::new(repo.clone(), coordination.clone(), ids.clone(), time.clone()));

    for i in 0..10 {
        submission.submit(web_request(i)).await.unwrap();
    }
    scheduler.tick().await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let dispatch = dispatch.clone();
        handles.push(tokio::spawn(async move { dispatch.fetch_job("web").await }));
    }

    let mut ok_ids = HashSet::new();
    let mut not_found = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(job) => {
                assert!(ok_ids.insert(job.id), "two fetches returned the same job");
            }
            Err(AppError::NotFound(_)) => not_found += 1,
            Err(e) => panic!("unexpected fetch error: {e:?}"),
        }
    }

    assert_eq!(ok_ids.len(), 10);
    assert_eq!(not_found, 10);
}

#[tokio::test]
async fn invalid_transition_is_rejected_and_row_unchanged() {
    let db = temp_db().await;
    let repo = job_repo(&db);
    let coordination = Arc::new(InMemoryCoordinationStore::default());
    let ids = Arc::new(SeqIdProvider::new("id"));
    let time = Arc::new(FakeTimeProvider::new(1_000));

    let submission = SubmissionService::new(repo.clone(), coordination.clone(), ids.clone(), time.clone());
    let scheduler = SchedulerLoop::new(repo.clone(), coordination.clone(), ids.clone(), time.clone(), SchedulerConfig::default());
    let dispatch = DispatchService::new(repo.clone(), coordination.clone(), ids.clone(), time.clone());

    let submitted = submission.submit(web_request(0)).await.unwrap();
    scheduler.tick().await.unwrap();
    let assigned = dispatch.fetch_job("web").await.unwrap();
    assert_eq!(assigned.status, JobStatus::Assigned);

    let result = dispatch
        .update_job_status(&submitted.job_id, JobStatus::Pending, None, None)
        .await;
    assert!(matches!(result, Err(AppError::FailedPrecondition(_))));

    let row = repo.get_job(&submitted.job_id).await.unwrap().unwrap();
    assert_eq!(row.status, JobStatus::Assigned);
}
