// SQLite JobRepository Implementation

use async_trait::async_trait;
use sqlx::SqlitePool;
use testorch_core::domain::{
    Agent, AgentId, AgentStatus, Job, JobGroup, JobGroupId, JobId, JobOutcome, JobStatus, Target,
};
use testorch_core::error::{AppError, Result};
use testorch_core::port::JobRepository;

/// Convert sqlx::Error to AppError with structured information
fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();
                match code_str {
                    "2067" | "1555" => AppError::AlreadyExists(format!(
                        "unique constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "787" | "3850" => AppError::Database(format!(
                        "foreign key constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "5" => AppError::Database(format!(
                        "database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => AppError::Database(format!("database full: {}", db_err.message())),
                    _ => AppError::Database(format!(
                        "database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("column not found: {col}")),
        _ => AppError::Database(format!("{err}")),
    }
}

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn create_job(&self, job: &Job) -> Result<Job> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, org, artifact, web_url, test_path, priority, target, test_kind,
                idempotency_token, created_at, status, group_id, completed_at,
                reclaim_count, last_activity_at,
                session_id, logs_url, video_url, error_message, duration_seconds
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.as_str())
        .bind(&job.org)
        .bind(&job.artifact)
        .bind(&job.web_url)
        .bind(&job.test_path)
        .bind(job.priority)
        .bind(job.target.as_str())
        .bind(job.test_kind.map(|k| k.as_str()))
        .bind(&job.idempotency_token)
        .bind(job.created_at)
        .bind(job.status.as_str())
        .bind(job.group_id.as_ref().map(|g| g.as_str()))
        .bind(job.completed_at)
        .bind(job.reclaim_count)
        .bind(job.last_activity_at)
        .bind(job.outcome.as_ref().and_then(|o| o.session_id.as_deref()))
        .bind(job.outcome.as_ref().and_then(|o| o.logs_url.as_deref()))
        .bind(job.outcome.as_ref().and_then(|o| o.video_url.as_deref()))
        .bind(job.outcome.as_ref().and_then(|o| o.error_message.as_deref()))
        .bind(job.outcome.as_ref().and_then(|o| o.duration_seconds))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(job.clone())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| r.into_job()).transpose()
    }

    async fn update_job_status(&self, id: &JobId, status: JobStatus, now: i64) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = ?, last_activity_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_job_result(
        &self,
        id: &JobId,
        status: JobStatus,
        outcome: JobOutcome,
        completed_at: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?, completed_at = ?, last_activity_at = ?,
                session_id = ?, logs_url = ?, video_url = ?, error_message = ?, duration_seconds = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(completed_at)
        .bind(completed_at)
        .bind(&outcome.session_id)
        .bind(&outcome.logs_url)
        .bind(&outcome.video_url)
        .bind(&outcome.error_message)
        .bind(outcome.duration_seconds)
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_pending_jobs(&self, limit: i64) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE status IN ('PENDING', 'RETRYING')
            ORDER BY priority DESC, created_at ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(|r| r.into_job()).collect()
    }

    async fn create_job_group(&self, group: &JobGroup) -> Result<JobGroup> {
        sqlx::query(
            "INSERT INTO job_groups (id, artifact, target, status, owning_agent, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(group.id.as_str())
        .bind(&group.artifact)
        .bind(group.target.as_str())
        .bind(group.status.as_str())
        .bind(group.owning_agent.as_ref().map(|a| a.as_str()))
        .bind(group.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(group.clone())
    }

    async fn assign_jobs_to_group(
        &self,
        job_ids: &[JobId],
        group_id: &JobGroupId,
        now: i64,
    ) -> Result<Vec<JobId>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut assigned = Vec::with_capacity(job_ids.len());

        for id in job_ids {
            let result = sqlx::query(
                r#"
                UPDATE jobs
                SET status = 'SCHEDULED', group_id = ?, last_activity_at = ?
                WHERE id = ? AND status IN ('PENDING', 'RETRYING')
                "#,
            )
            .bind(group_id.as_str())
            .bind(now)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            if result.rows_affected() > 0 {
                assigned.push(id.clone());
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(assigned)
    }

    async fn get_next_job(&self, target: Target, now: i64) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET status = 'ASSIGNED', last_activity_at = ?
            WHERE id = (
                SELECT id FROM jobs
                WHERE target = ? AND status = 'SCHEDULED'
                ORDER BY priority DESC, created_at ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(target.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| r.into_job()).transpose()
    }

    async fn create_agent(&self, agent: &Agent) -> Result<Agent> {
        sqlx::query(
            "INSERT INTO agents (id, hostname, capability, status, last_heartbeat_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(agent.id.as_str())
        .bind(&agent.hostname)
        .bind(agent.capability.as_str())
        .bind(agent.status.as_str())
        .bind(agent.last_heartbeat_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(agent.clone())
    }

    async fn update_agent_heartbeat(&self, id: &AgentId, now: i64) -> Result<()> {
        sqlx::query("UPDATE agents SET last_heartbeat_at = ? WHERE id = ?")
            .bind(now)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_available_agents(&self, capability: Target) -> Result<Vec<Agent>> {
        let rows: Vec<AgentRow> = sqlx::query_as(
            "SELECT * FROM agents WHERE capability = ? AND status = 'IDLE'",
        )
        .bind(capability.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(|r| r.into_agent()).collect()
    }

    async fn find_stale_jobs(&self, heartbeat_cutoff: i64) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE status IN ('ASSIGNED', 'RUNNING') AND last_activity_at < ?
            "#,
        )
        .bind(heartbeat_cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(|r| r.into_job()).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    org: String,
    artifact: Option<String>,
    web_url: Option<String>,
    test_path: String,
    priority: i32,
    target: String,
    test_kind: Option<String>,
    idempotency_token: Option<String>,
    created_at: i64,
    status: String,
    group_id: Option<String>,
    completed_at: Option<i64>,
    reclaim_count: i32,
    last_activity_at: i64,
    session_id: Option<String>,
    logs_url: Option<String>,
    video_url: Option<String>,
    error_message: Option<String>,
    duration_seconds: Option<i64>,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        let target = Target::parse(&self.target)
            .ok_or_else(|| AppError::Internal(format!("unknown target in row: {}", self.target)))?;
        let status = JobStatus::parse(&self.status)
            .ok_or_else(|| AppError::Internal(format!("unknown status in row: {}", self.status)))?;
        let test_kind = self
            .test_kind
            .as_deref()
            .and_then(testorch_core::domain::TestKind::parse);

        let outcome = if self.session_id.is_some()
            || self.logs_url.is_some()
            || self.video_url.is_some()
            || self.error_message.is_some()
            || self.duration_seconds.is_some()
        {
            Some(JobOutcome {
                session_id: self.session_id,
                logs_url: self.logs_url,
                video_url: self.video_url,
                error_message: self.error_message,
                duration_seconds: self.duration_seconds,
            })
        } else {
            None
        };

        Ok(Job {
            id: JobId::new(self.id),
            org: self.org,
            artifact: self.artifact,
            web_url: self.web_url,
            test_path: self.test_path,
            priority: self.priority,
            target,
            test_kind,
            idempotency_token: self.idempotency_token,
            created_at: self.created_at,
            status,
            group_id: self.group_id.map(JobGroupId::new),
            completed_at: self.completed_at,
            outcome,
            reclaim_count: self.reclaim_count,
            last_activity_at: self.last_activity_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AgentRow {
    id: String,
    hostname: String,
    capability: String,
    status: String,
    last_heartbeat_at: i64,
}

impl AgentRow {
    fn into_agent(self) -> Result<Agent> {
        let capability = Target::parse(&self.capability).ok_or_else(|| {
            AppError::Internal(format!("unknown capability in row: {}", self.capability))
        })?;
        let status = match self.status.as_str() {
            "IDLE" => AgentStatus::Idle,
            "BUSY" => AgentStatus::Busy,
            other => return Err(AppError::Internal(format!("unknown agent status in row: {other}"))),
        };

        Ok(Agent {
            id: AgentId::new(self.id),
            hostname: self.hostname,
            capability,
            status,
            last_heartbeat_at: self.last_heartbeat_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testorch_core::domain::JobGroup;

    async fn setup_test_db() -> SqlitePool {
        let pool = crate::create_pool("sqlite::memory:").await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        pool
    }

    fn sample_job(id: &str, priority: i32, created_at: i64, artifact: &str, target: Target) -> Job {
        Job::new(
            JobId::new(id),
            "org-a",
            Some(artifact.to_string()),
            None,
            "a.spec",
            priority,
            target,
            None,
            None,
            created_at,
        )
    }

    #[tokio::test]
    async fn create_and_get_job_round_trips() {
        let pool = setup_test_db().await;
        let repo = SqliteJobRepository::new(pool);

        let job = sample_job("j1", 5, 100, "v1", Target::Emulator);
        repo.create_job(&job).await.unwrap();

        let found = repo.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(found.id, job.id);
        assert_eq!(found.status, JobStatus::Pending);
        assert_eq!(found.priority, 5);
    }

    #[tokio::test]
    async fn duplicate_idempotency_token_is_rejected() {
        let pool = setup_test_db().await;
        let repo = SqliteJobRepository::new(pool);

        let mut j1 = sample_job("j1", 1, 1, "v1", Target::Emulator);
        j1.idempotency_token = Some("tok-1".to_string());
        repo.create_job(&j1).await.unwrap();

        let mut j2 = sample_job("j2", 1, 2, "v1", Target::Emulator);
        j2.idempotency_token = Some("tok-1".to_string());
        let err = repo.create_job(&j2).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn get_pending_jobs_orders_by_priority_then_age_and_includes_retrying() {
        let pool = setup_test_db().await;
        let repo = SqliteJobRepository::new(pool);

        repo.create_job(&sample_job("j1", 3, 10, "v1", Target::Device)).await.unwrap();
        repo.create_job(&sample_job("j2", 5, 11, "v1", Target::Device)).await.unwrap();

        let mut retrying = sample_job("j3", 1, 12, "v1", Target::Device);
        retrying.status = JobStatus::Retrying;
        sqlx::query("INSERT INTO jobs (id, org, artifact, web_url, test_path, priority, target, test_kind, idempotency_token, created_at, status, group_id, completed_at, reclaim_count, last_activity_at, session_id, logs_url, video_url, error_message, duration_seconds) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind("j3").bind("org-a").bind("v1").bind(None::<String>).bind("a.spec")
            .bind(1).bind("device").bind(None::<String>).bind(None::<String>).bind(12)
            .bind("RETRYING").bind(None::<String>).bind(None::<i64>).bind(0).bind(12)
            .bind(None::<String>).bind(None::<String>).bind(None::<String>).bind(None::<String>).bind(None::<i64>)
            .execute(repo_pool(&repo)).await.unwrap();

        let pending = repo.get_pending_jobs(10).await.unwrap();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].id, JobId::new("j2"));
        assert_eq!(pending[1].id, JobId::new("j1"));
        assert_eq!(pending[2].id, JobId::new("j3"));
    }

    fn repo_pool(repo: &SqliteJobRepository) -> &SqlitePool {
        &repo.pool
    }

    #[tokio::test]
    async fn assign_jobs_to_group_only_touches_pending_and_retrying() {
        let pool = setup_test_db().await;
        let repo = SqliteJobRepository::new(pool);

        repo.create_job(&sample_job("j1", 1, 1, "v1", Target::Web)).await.unwrap();
        let mut running = sample_job("j2", 1, 2, "v1", Target::Web);
        running.status = JobStatus::Running;
        repo.create_job(&running).await.unwrap();

        let group = JobGroup::new(JobGroupId::new("g1"), Some("v1".to_string()), Target::Web, 1);
        repo.create_job_group(&group).await.unwrap();

        let assigned = repo
            .assign_jobs_to_group(&[JobId::new("j1"), JobId::new("j2")], &group.id, 5)
            .await
            .unwrap();

        assert_eq!(assigned, vec![JobId::new("j1")]);
        assert_eq!(repo.get_job(&JobId::new("j1")).await.unwrap().unwrap().status, JobStatus::Scheduled);
        assert_eq!(repo.get_job(&JobId::new("j2")).await.unwrap().unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn get_next_job_is_atomic_and_scoped_by_target() {
        let pool = setup_test_db().await;
        let repo = SqliteJobRepository::new(pool);

        let mut scheduled = sample_job("j1", 1, 1, "v1", Target::Web);
        scheduled.status = JobStatus::Scheduled;
        repo.create_job(&scheduled).await.unwrap();

        let fetched = repo.get_next_job(Target::Web, 100).await.unwrap().unwrap();
        assert_eq!(fetched.id, JobId::new("j1"));
        assert_eq!(fetched.status, JobStatus::Assigned);

        let none_left = repo.get_next_job(Target::Web, 100).await.unwrap();
        assert!(none_left.is_none());
    }

    #[tokio::test]
    async fn find_stale_jobs_filters_by_last_activity() {
        let pool = setup_test_db().await;
        let repo = SqliteJobRepository::new(pool);

        let mut stuck = sample_job("j1", 1, 0, "v1", Target::Web);
        stuck.status = JobStatus::Assigned;
        repo.create_job(&stuck).await.unwrap();

        let stale = repo.find_stale_jobs(500).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, JobId::new("j1"));

        let not_stale = repo.find_stale_jobs(-1).await.unwrap();
        assert!(not_stale.is_empty());
    }
}
