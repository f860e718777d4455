// In-memory CoordinationStore fake, for tests and for running the daemon
// without a Redis dependency. Grounded on the `InMemoryCoordination` test
// double in `testorch_core::application::scheduler`'s test module, but
// TTL-aware so it behaves like the real store under a real clock instead
// of always answering "not expired".

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use testorch_core::domain::{JobGroupId, JobId, JobStatus, Target};
use testorch_core::error::Result;
use testorch_core::port::CoordinationStore;

struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn fresh(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Default)]
pub struct InMemoryCoordinationStore {
    ingestion: Mutex<VecDeque<JobId>>,
    dispatch: Mutex<HashMap<Target, VecDeque<JobGroupId>>>,
    leases: Mutex<HashSet<String>>,
    idempotency: Mutex<HashMap<String, Expiring<()>>>,
    status_cache: Mutex<HashMap<JobId, Expiring<JobStatus>>>,
    heartbeats: Mutex<HashMap<String, Expiring<()>>>,
}

#[async_trait]
impl CoordinationStore for InMemoryCoordinationStore {
    async fn push_ingestion(&self, job_id: &JobId) -> Result<()> {
        self.ingestion.lock().unwrap().push_back(job_id.clone());
        Ok(())
    }

    async fn pop_ingestion(&self, _timeout: Duration) -> Result<Option<JobId>> {
        Ok(self.ingestion.lock().unwrap().pop_front())
    }

    async fn push_dispatch(&self, target: Target, group_id: &JobGroupId) -> Result<()> {
        self.dispatch
            .lock()
            .unwrap()
            .entry(target)
            .or_default()
            .push_back(group_id.clone());
        Ok(())
    }

    async fn pop_dispatch(&self, target: Target, _timeout: Duration) -> Result<Option<JobGroupId>> {
        Ok(self
            .dispatch
            .lock()
            .unwrap()
            .entry(target)
            .or_default()
            .pop_front())
    }

    async fn acquire_lease(&self, key: &str, _ttl: Duration) -> Result<bool> {
        Ok(self.leases.lock().unwrap().insert(key.to_string()))
    }

    async fn release_lease(&self, key: &str) -> Result<()> {
        self.leases.lock().unwrap().remove(key);
        Ok(())
    }

    async fn mark_idempotent(&self, token: &str, ttl: Duration) -> Result<()> {
        self.idempotency
            .lock()
            .unwrap()
            .insert(token.to_string(), Expiring::fresh((), ttl));
        Ok(())
    }

    async fn is_idempotent(&self, token: &str) -> Result<bool> {
        let mut guard = self.idempotency.lock().unwrap();
        Ok(match guard.get(token) {
            Some(entry) if entry.is_live() => true,
            Some(_) => {
                guard.remove(token);
                false
            }
            None => false,
        })
    }

    async fn set_status_cache(&self, id: &JobId, status: JobStatus, ttl: Duration) -> Result<()> {
        self.status_cache
            .lock()
            .unwrap()
            .insert(id.clone(), Expiring::fresh(status, ttl));
        Ok(())
    }

    async fn get_status_cache(&self, id: &JobId) -> Result<Option<JobStatus>> {
        let mut guard = self.status_cache.lock().unwrap();
        Ok(match guard.get(id) {
            Some(entry) if entry.is_live() => Some(entry.value),
            Some(_) => {
                guard.remove(id);
                None
            }
            None => None,
        })
    }

    async fn set_heartbeat(&self, agent_id: &str, ttl: Duration) -> Result<()> {
        self.heartbeats
            .lock()
            .unwrap()
            .insert(agent_id.to_string(), Expiring::fresh((), ttl));
        Ok(())
    }

    async fn is_alive(&self, agent_id: &str) -> Result<bool> {
        let mut guard = self.heartbeats.lock().unwrap();
        Ok(match guard.get(agent_id) {
            Some(entry) if entry.is_live() => true,
            Some(_) => {
                guard.remove(agent_id);
                false
            }
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn lease_is_exclusive_until_released() {
        let cs = InMemoryCoordinationStore::default();
        assert!(cs.acquire_lease("scheduler:lock", Duration::from_secs(60)).await.unwrap());
        assert!(!cs.acquire_lease("scheduler:lock", Duration::from_secs(60)).await.unwrap());
        cs.release_lease("scheduler:lock").await.unwrap();
        assert!(cs.acquire_lease("scheduler:lock", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn idempotency_mark_expires() {
        let cs = InMemoryCoordinationStore::default();
        cs.mark_idempotent("tok-1", Duration::from_millis(10)).await.unwrap();
        assert!(cs.is_idempotent("tok-1").await.unwrap());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!cs.is_idempotent("tok-1").await.unwrap());
    }

    #[tokio::test]
    async fn status_cache_round_trips() {
        let cs = InMemoryCoordinationStore::default();
        let id = JobId::new("j1");
        assert_eq!(cs.get_status_cache(&id).await.unwrap(), None);
        cs.set_status_cache(&id, JobStatus::Running, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(cs.get_status_cache(&id).await.unwrap(), Some(JobStatus::Running));
    }

    #[tokio::test]
    async fn dispatch_queue_is_fifo_per_target() {
        let cs = InMemoryCoordinationStore::default();
        cs.push_dispatch(Target::Device, &JobGroupId::new("g1")).await.unwrap();
        cs.push_dispatch(Target::Device, &JobGroupId::new("g2")).await.unwrap();
        cs.push_dispatch(Target::Web, &JobGroupId::new("g3")).await.unwrap();

        assert_eq!(
            cs.pop_dispatch(Target::Device, Duration::from_millis(0)).await.unwrap(),
            Some(JobGroupId::new("g1"))
        );
        assert_eq!(
            cs.pop_dispatch(Target::Web, Duration::from_millis(0)).await.unwrap(),
            Some(JobGroupId::new("g3"))
        );
        assert_eq!(
            cs.pop_dispatch(Target::Device, Duration::from_millis(0)).await.unwrap(),
            Some(JobGroupId::new("g2"))
        );
    }
}
