//! Scheduler (SC) — the core loop (section 4.4).
//!
//! Replicas run an identical periodic loop. Each tick: acquire the
//! mutual-exclusion lease, drain a batch of PENDING jobs, group and
//! promote them to SCHEDULED, sweep for jobs stuck behind a dead
//! agent's heartbeat, then release the lease.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::application::shutdown::ShutdownToken;
use crate::domain::agent::HEARTBEAT_FRESHNESS_MS;
use crate::domain::{Job, JobGroup, JobGroupId, JobId, Target};
use crate::error::Result;
use crate::port::{CoordinationStore, IdProvider, JobRepository, TimeProvider};

const LEASE_KEY: &str = "scheduler:lock";

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub lease_ttl: Duration,
    pub batch_size: i64,
    /// How many times the reaper will return a job to SCHEDULED before
    /// giving up and failing it (section 7 leaves this to deployment).
    pub max_reclaims: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            lease_ttl: Duration::from_secs(60),
            batch_size: 10,
            max_reclaims: 3,
        }
    }
}

pub struct SchedulerLoop {
    job_repo: Arc<dyn JobRepository>,
    coordination: Arc<dyn CoordinationStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    config: SchedulerConfig,
}

impl SchedulerLoop {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        coordination: Arc<dyn CoordinationStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            job_repo,
            coordination,
            id_provider,
            time_provider,
            config,
        }
    }

    /// Run until `shutdown` fires. In-flight ticks are allowed to
    /// finish (bounded by the lease TTL) before the loop exits.
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(
            tick_secs = self.config.tick_interval.as_secs(),
            "scheduler loop started"
        );
        let mut tick = interval(self.config.tick_interval);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = ?e, "scheduler tick failed");
                    }
                }
                _ = shutdown.wait() => {
                    info!("scheduler loop shutting down");
                    break;
                }
            }
        }
    }

    /// One scheduling tick. Returns `Ok(())` whether or not the lease
    /// was acquired -- a skipped tick is not an error.
    pub async fn tick(&self) -> Result<()> {
        let acquired = match self
            .coordination
            .acquire_lease(LEASE_KEY, self.config.lease_ttl)
            .await
        {
            Ok(acquired) => acquired,
            Err(e) => {
                warn!(error = ?e, "lease acquisition failed; skipping tick");
                return Ok(());
            }
        };
        if !acquired {
            debug!("scheduler lease held by another replica; skipping tick");
            return Ok(());
        }

        let promote_result = self.promote_batch().await;
        if let Err(e) = &promote_result {
            error!(error = ?e, "promotion step failed");
        }
        if let Err(e) = self.sweep_stale_jobs().await {
            error!(error = ?e, "reaper sweep failed");
        }

        if let Err(e) = self.coordination.release_lease(LEASE_KEY).await {
            warn!(error = ?e, "failed to release scheduler lease (will auto-expire)");
        }

        promote_result.map(|_| ())
    }

    /// Step 2-4: scan PENDING and RETRYING jobs, group by (artifact,
    /// target), promote each group to SCHEDULED, push an advisory
    /// dispatch hint.
    async fn promote_batch(&self) -> Result<usize> {
        let pending = self.job_repo.get_pending_jobs(self.config.batch_size).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        // Preserve PS ordering (priority DESC, created_at ASC) within
        // each group: the first job seen for a key is its survivor.
        let mut groups: Vec<((Option<String>, Target), Vec<Job>)> = Vec::new();
        for job in pending {
            let key = JobGroup::key(&job.artifact, job.target);
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(job),
                None => groups.push((key, vec![job])),
            }
        }

        let mut promoted = 0usize;
        for ((artifact, target), jobs) in groups {
            let group_id = JobGroupId::new(self.id_provider.generate_id());
            let now = self.time_provider.now_millis();
            let group = JobGroup::new(group_id.clone(), artifact, target, now);
            self.job_repo.create_job_group(&group).await?;

            let job_ids: Vec<JobId> = jobs.iter().map(|j| j.id.clone()).collect();
            let assigned = self
                .job_repo
                .assign_jobs_to_group(&job_ids, &group_id, now)
                .await?;
            promoted += assigned.len();

            if let Err(e) = self.coordination.push_dispatch(target, &group_id).await {
                warn!(error = ?e, group_id = %group_id, "failed to push dispatch hint (advisory only)");
            }
        }

        info!(promoted, "scheduler tick promoted jobs");
        Ok(promoted)
    }

    /// The reaper sweep (section 7): jobs stuck in ASSIGNED/RUNNING
    /// behind an agent whose heartbeat has gone stale are reclaimed.
    /// Runs under the same lease as promotion.
    async fn sweep_stale_jobs(&self) -> Result<usize> {
        let now = self.time_provider.now_millis();
        let cutoff = now - HEARTBEAT_FRESHNESS_MS;
        let stale = self.job_repo.find_stale_jobs(cutoff).await?;

        let mut reclaimed = 0usize;
        for mut job in stale {
            if let Err(e) = job.reclaim(self.config.max_reclaims, now) {
                warn!(error = ?e, job_id = %job.id, "reaper could not reclaim job");
                continue;
            }

            let write = if job.status.is_terminal() {
                self.job_repo
                    .update_job_result(&job.id, job.status, job.outcome.clone().unwrap_or_default(), now)
                    .await
            } else {
                self.job_repo.update_job_status(&job.id, job.status, now).await
            };

            match write {
                Ok(()) => reclaimed += 1,
                Err(e) => error!(error = ?e, job_id = %job.id, "failed to persist reclaim"),
            }
        }

        if reclaimed > 0 {
            info!(reclaimed, "reaper reclaimed stale jobs");
        }
        Ok(reclaimed)
    }
}
