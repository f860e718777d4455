// Scenario 3 (grouping) and scenario 4 (concurrent schedulers), against
// a real SQLite-backed PS shared by every replica in the test.

mod support;

use std::collections::HashMap;
use std::sync::Arc;

use testorch_core::application::{SchedulerConfig, SchedulerLoop, SubmissionService, SubmitRequest};
use testorch_core::domain::JobStatus;
use testorch_core::port::JobRepository;
use testorch_infra_coordination::InMemoryCoordinationStore;

use support::{job_repo, temp_db, FakeTimeProvider, SeqIdProvider};

fn request(artifact: &str, target: &str, priority: i32) -> SubmitRequest {
    SubmitRequest {
        org: "o1".to_string(),
        artifact: Some(artifact.to_string()),
        web_url: None,
        test_path: "a.spec".to_string(),
        priority,
        target: target.to_string(),
        test_kind: None,
        idempotency_token: None,
    }
}

#[tokio::test]
async fn one_tick_groups_by_artifact_and_target() {
    let db = temp_db().await;
    let repo = job_repo(&db);
    let coordination = Arc::new(InMemoryCoordinationStore::default());
    let ids = Arc::new(SeqIdProvider::new("id"));
    let time = Arc::new(FakeTimeProvider::new(1_000));

    let submission = SubmissionService::new(repo.clone(), coordination.clone(), ids.clone(), time.clone());
    let scheduler = SchedulerLoop::new(repo.clone(), coordination.clone(), ids.clone(), time.clone(), SchedulerConfig::default());

    let device_a = submission.submit(request("v9", "device", 3)).await.unwrap();
    let device_b = submission.submit(request("v9", "device", 5)).await.unwrap();
    let device_c = submission.submit(request("v9", "device", 3)).await.unwrap();
    let emulator = submission.submit(request("v9", "emulator", 5)).await.unwrap();

    scheduler.tick().await.unwrap();

    let a = repo.get_job(&device_a.job_id).await.unwrap().unwrap();
    let b = repo.get_job(&device_b.job_id).await.unwrap().unwrap();
    let c = repo.get_job(&device_c.job_id).await.unwrap().unwrap();
    let e = repo.get_job(&emulator.job_id).await.unwrap().unwrap();

    for job in [&a, &b, &c, &e] {
        assert_eq!(job.status, JobStatus::Scheduled);
        assert!(job.group_id.is_some());
    }

    assert_eq!(a.group_id, b.group_id);
    assert_eq!(a.group_id, c.group_id);
    assert_ne!(a.group_id, e.group_id);
}

#[tokio::test]
async fn concurrent_replicas_never_double_group_and_all_converge() {
    let db = temp_db().await;
    let repo = job_repo(&db);
    let coordination = Arc::new(InMemoryCoordinationStore::default());
    let ids = Arc::new(SeqIdProvider::new("id"));
    let time = Arc::new(FakeTimeProvider::new(1_000));

    let submission = SubmissionService::new(repo.clone(), coordination.clone(), ids.clone(), time.clone());

    let mut job_ids = Vec::new();
    for i in 0..50 {
        let artifact = format!("artifact-{}", i % 5);
        let target = if i % 2 == 0 { "device" } else { "emulator" };
        let submitted = submission.submit(request(&artifact, target, (i % 10) as i32)).await.unwrap();
        job_ids.push(submitted.job_id);
    }

    let config = SchedulerConfig {
        tick_interval: std::time::Duration::from_secs(5),
        lease_ttl: std::time::Duration::from_secs(2),
        batch_size: 10,
        max_reclaims: 3,
    };

    let sc_a = Arc::new(SchedulerLoop::new(repo.clone(), coordination.clone(), ids.clone(), time.clone(), config.clone()));
    let sc_b = Arc::new(SchedulerLoop::new(repo.clone(), coordination.clone(), ids.clone(), time.clone(), config));

    let run_replica = |scheduler: Arc<SchedulerLoop>| {
        tokio::spawn(async move {
            for _ in 0..25 {
                let _ = scheduler.tick().await;
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            }
        })
    };

    let (r1, r2) = tokio::join!(run_replica(sc_a), run_replica(sc_b));
    r1.unwrap();
    r2.unwrap();

    let mut jobs_by_group: HashMap<String, Vec<(Option<String>, &'static str)>> = HashMap::new();
    for id in &job_ids {
        let job = repo.get_job(id).await.unwrap().expect("job must still exist");
        assert_eq!(job.status, JobStatus::Scheduled, "job {id} left unpromoted");
        let group_id = job.group_id.expect("scheduled job must carry a group id").0;
        jobs_by_group
            .entry(group_id)
            .or_default()
            .push((job.artifact.clone(), job.target.as_str()));
    }

    // Invariant 6 (section 8): every member of a group shares the group's
    // (artifact, target) key -- no replica mixed two different keys into
    // one group under the race.
    for members in jobs_by_group.values() {
        let (first_artifact, first_target) = &members[0];
        for (artifact, target) in members {
            assert_eq!(artifact, first_artifact);
            assert_eq!(target, first_target);
        }
    }
}
