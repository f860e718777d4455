// Persistent Store (PS) port.
//
// A transactional relational store exposing jobs, job groups, and
// agents with the guarantees in section 4.1: `get_next_job` and
// `assign_jobs_to_group` must be atomic per row under concurrent
// callers (see the SQLite adapter's single-statement UPDATE...RETURNING
// realization).

use crate::domain::{Agent, AgentId, Job, JobGroup, JobGroupId, JobId, JobOutcome, JobStatus, Target};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a job in PENDING. Rejects duplicate idempotency tokens as
    /// a secondary safety net (unique partial index) -- the primary
    /// check lives in the coordination store.
    async fn create_job(&self, job: &Job) -> Result<Job>;

    /// Strongly consistent read of all fields.
    async fn get_job(&self, id: &JobId) -> Result<Option<Job>>;

    /// Unconditional status write, stamping `last_activity_at = now`.
    /// Callers are responsible for legality; this method additionally
    /// refuses transitions forbidden by the state machine as defense in
    /// depth.
    async fn update_job_status(&self, id: &JobId, status: JobStatus, now: i64) -> Result<()>;

    /// Sets terminal outcome fields and `completed_at`, atomic with the
    /// status write.
    async fn update_job_result(
        &self,
        id: &JobId,
        status: JobStatus,
        outcome: JobOutcome,
        completed_at: i64,
    ) -> Result<()>;

    /// Up to `limit` jobs ready for (re-)promotion -- status PENDING or
    /// RETRYING -- ordered priority DESC then created_at ASC. Safe under
    /// concurrent scheduler replicas.
    async fn get_pending_jobs(&self, limit: i64) -> Result<Vec<Job>>;

    async fn create_job_group(&self, group: &JobGroup) -> Result<JobGroup>;

    /// Atomically sets `group_id` and flips status to SCHEDULED for
    /// every id in `job_ids` currently PENDING or RETRYING. Ids in any
    /// other status are left untouched; the returned vector lists only
    /// the ids that were actually promoted.
    async fn assign_jobs_to_group(
        &self,
        job_ids: &[JobId],
        group_id: &JobGroupId,
        now: i64,
    ) -> Result<Vec<JobId>>;

    /// The single highest-priority, oldest SCHEDULED job for `target`,
    /// atomically marked ASSIGNED with `last_activity_at = now`. `None`
    /// if nothing is available.
    async fn get_next_job(&self, target: Target, now: i64) -> Result<Option<Job>>;

    async fn create_agent(&self, agent: &Agent) -> Result<Agent>;

    async fn update_agent_heartbeat(&self, id: &AgentId, now: i64) -> Result<()>;

    /// Agents with status IDLE and a fresh heartbeat, for `capability`.
    async fn get_available_agents(&self, capability: Target) -> Result<Vec<Agent>>;

    /// Jobs in ASSIGNED or RUNNING whose `last_activity_at` is older
    /// than `heartbeat_cutoff` -- claimed but never reported back on.
    /// Feeds the reaper sweep (section 7).
    async fn find_stale_jobs(&self, heartbeat_cutoff: i64) -> Result<Vec<Job>>;
}
