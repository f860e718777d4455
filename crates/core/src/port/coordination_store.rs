// Coordination Store (CS) port.
//
// A key-value store with TTL, atomic SETNX, list primitives, and
// blocking pop. CS is authoritative only for leases and idempotency
// marks; everything else is a performance shadow of PS and must
// tolerate being empty (section 4.2).

use std::time::Duration;

use crate::domain::{JobGroupId, JobId, JobStatus, Target};
use crate::error::Result;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// `ingestion_queue`: FIFO, at-least-once delivery, advisory only.
    async fn push_ingestion(&self, job_id: &JobId) -> Result<()>;
    async fn pop_ingestion(&self, timeout: Duration) -> Result<Option<JobId>>;

    /// `dispatch_queue:<target>`: per-target FIFO, advisory wake-up only
    /// (section 9: agents poll `FetchJob` directly; nothing consumes
    /// this queue inside the core).
    async fn push_dispatch(&self, target: Target, group_id: &JobGroupId) -> Result<()>;
    async fn pop_dispatch(&self, target: Target, timeout: Duration) -> Result<Option<JobGroupId>>;

    /// `scheduler:lock`: SETNX with TTL. Returns `true` if the lease was
    /// acquired, `false` if another replica already holds it.
    async fn acquire_lease(&self, key: &str, ttl: Duration) -> Result<bool>;
    async fn release_lease(&self, key: &str) -> Result<()>;

    /// `idempotency:<token>`.
    async fn mark_idempotent(&self, token: &str, ttl: Duration) -> Result<()>;
    async fn is_idempotent(&self, token: &str) -> Result<bool>;

    /// `job:status:<id>`: read-through cache for status reads.
    async fn set_status_cache(&self, id: &JobId, status: JobStatus, ttl: Duration) -> Result<()>;
    async fn get_status_cache(&self, id: &JobId) -> Result<Option<JobStatus>>;

    /// `agent:heartbeat:<id>`: key existence implies liveness.
    async fn set_heartbeat(&self, agent_id: &str, ttl: Duration) -> Result<()>;
    async fn is_alive(&self, agent_id: &str) -> Result<bool>;
}
