// Dispatch Interface (DI): agent registration, job fetch, status
// updates (section 4.5).

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::{Agent, AgentId, Job, JobId, JobOutcome, JobStatus, Target};
use crate::error::{AppError, Result};
use crate::port::{CoordinationStore, IdProvider, JobRepository, TimeProvider};

const HEARTBEAT_TTL: Duration = Duration::from_secs(2 * 60);
const STATUS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

pub struct DispatchService {
    job_repo: Arc<dyn JobRepository>,
    coordination: Arc<dyn CoordinationStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl DispatchService {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        coordination: Arc<dyn CoordinationStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            job_repo,
            coordination,
            id_provider,
            time_provider,
        }
    }

    /// Inserts in PS with status IDLE, seeds the CS heartbeat.
    pub async fn register_agent(&self, hostname: &str, capability: &str) -> Result<AgentId> {
        if hostname.trim().is_empty() {
            return Err(AppError::InvalidArgument("hostname must not be empty".to_string()));
        }
        let target = Target::parse(capability)
            .ok_or_else(|| AppError::InvalidArgument(format!("unrecognized capability: {capability}")))?;

        let id = AgentId::new(self.id_provider.generate_id());
        let now = self.time_provider.now_millis();
        let agent = Agent::new(id, hostname, target, now);
        let created = self.job_repo.create_agent(&agent).await?;

        if let Err(e) = self.coordination.set_heartbeat(created.id.as_str(), HEARTBEAT_TTL).await {
            warn!(error = ?e, agent_id = %created.id, "failed to seed agent heartbeat");
        }

        Ok(created.id)
    }

    /// `PS.GetNextJob` atomically picks the highest-priority oldest
    /// SCHEDULED job for `capability` and flips it to ASSIGNED. No job
    /// available is a normal, expected `NotFound` -- agents poll.
    pub async fn fetch_job(&self, capability: &str) -> Result<Job> {
        let target = Target::parse(capability)
            .ok_or_else(|| AppError::InvalidArgument(format!("unrecognized capability: {capability}")))?;

        let now = self.time_provider.now_millis();
        self.job_repo
            .get_next_job(target, now)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no scheduled job for target {capability}")))
    }

    /// Validates the transition against the state machine, writes to
    /// PS, refreshes the CS status cache and the agent's heartbeat.
    pub async fn update_job_status(
        &self,
        job_id: &JobId,
        new_status: JobStatus,
        agent_id: Option<&AgentId>,
        outcome: Option<JobOutcome>,
    ) -> Result<()> {
        let mut job = self
            .job_repo
            .get_job(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job not found: {job_id}")))?;

        let now = self.time_provider.now_millis();

        if new_status.is_terminal() {
            job.complete_with(new_status, outcome.unwrap_or_default(), now)?;
            self.job_repo
                .update_job_result(job_id, job.status, job.outcome.clone().unwrap_or_default(), now)
                .await?;
        } else {
            job.transition_to(new_status)?;
            self.job_repo.update_job_status(job_id, job.status, now).await?;
        }

        if let Err(e) = self
            .coordination
            .set_status_cache(job_id, job.status, STATUS_CACHE_TTL)
            .await
        {
            warn!(error = ?e, job_id = %job_id, "failed to refresh status cache");
        }

        if let Some(agent_id) = agent_id {
            if let Err(e) = self.job_repo.update_agent_heartbeat(agent_id, now).await {
                warn!(error = ?e, agent_id = %agent_id, "failed to refresh agent heartbeat in PS");
            }
            if let Err(e) = self.coordination.set_heartbeat(agent_id.as_str(), HEARTBEAT_TTL).await {
                warn!(error = ?e, agent_id = %agent_id, "failed to refresh agent heartbeat in CS");
            }
        }

        Ok(())
    }
}
