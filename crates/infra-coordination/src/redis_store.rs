// Redis-backed CoordinationStore (CS).
//
// Key layout (section 6/7): `ingestion_queue`, `dispatch_queue:<target>`,
// `scheduler:lock`, `idempotency:<token>`, `job:status:<id>`,
// `agent:heartbeat:<id>`.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use testorch_core::domain::{JobGroupId, JobId, JobStatus, Target};
use testorch_core::error::{AppError, Result};
use testorch_core::port::CoordinationStore;

fn map_err(err: redis::RedisError) -> AppError {
    AppError::Coordination(err.to_string())
}

/// Ceil-divides a `Duration` into whole seconds, the unit Redis' `EX`
/// and blocking-pop timeouts both take. A sub-second TTL rounds up
/// rather than collapsing to an un-expiring `0`.
fn ttl_secs(ttl: Duration) -> i64 {
    ttl.as_secs() as i64 + i64::from(ttl.subsec_nanos() > 0)
}

fn dispatch_key(target: Target) -> String {
    format!("dispatch_queue:{}", target.as_str())
}

pub struct RedisCoordinationStore {
    conn: ConnectionManager,
}

impl RedisCoordinationStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Config(format!("invalid redis url: {e}")))?;
        let conn = client.get_connection_manager().await.map_err(map_err)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CoordinationStore for RedisCoordinationStore {
    async fn push_ingestion(&self, job_id: &JobId) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .lpush("ingestion_queue", job_id.as_str())
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn pop_ingestion(&self, timeout: Duration) -> Result<Option<JobId>> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn
            .brpop("ingestion_queue", ttl_secs(timeout) as f64)
            .await
            .map_err(map_err)?;
        Ok(popped.map(|(_, id)| JobId::new(id)))
    }

    async fn push_dispatch(&self, target: Target, group_id: &JobGroupId) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .lpush(dispatch_key(target), group_id.as_str())
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn pop_dispatch(&self, target: Target, timeout: Duration) -> Result<Option<JobGroupId>> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn
            .brpop(dispatch_key(target), ttl_secs(timeout) as f64)
            .await
            .map_err(map_err)?;
        Ok(popped.map(|(_, id)| JobGroupId::new(id)))
    }

    async fn acquire_lease(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let acquired: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as i64)
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(acquired.is_some())
    }

    async fn release_lease(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await.map_err(map_err)?;
        Ok(())
    }

    async fn mark_idempotent(&self, token: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = format!("idempotency:{token}");
        let _: () = conn.set_ex(key, 1, ttl_secs(ttl) as u64).await.map_err(map_err)?;
        Ok(())
    }

    async fn is_idempotent(&self, token: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let key = format!("idempotency:{token}");
        let exists: bool = conn.exists(key).await.map_err(map_err)?;
        Ok(exists)
    }

    async fn set_status_cache(&self, id: &JobId, status: JobStatus, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = format!("job:status:{}", id.as_str());
        let _: () = conn
            .set_ex(key, status.as_str(), ttl_secs(ttl) as u64)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn get_status_cache(&self, id: &JobId) -> Result<Option<JobStatus>> {
        let mut conn = self.conn.clone();
        let key = format!("job:status:{}", id.as_str());
        let raw: Option<String> = conn.get(key).await.map_err(map_err)?;
        Ok(raw.and_then(|s| JobStatus::parse(&s)))
    }

    async fn set_heartbeat(&self, agent_id: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = format!("agent:heartbeat:{agent_id}");
        let _: () = conn.set_ex(key, 1, ttl_secs(ttl) as u64).await.map_err(map_err)?;
        Ok(())
    }

    async fn is_alive(&self, agent_id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let key = format!("agent:heartbeat:{agent_id}");
        let exists: bool = conn.exists(key).await.map_err(map_err)?;
        Ok(exists)
    }
}
