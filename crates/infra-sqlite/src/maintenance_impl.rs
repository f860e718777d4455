// SQLite Maintenance Implementation

use async_trait::async_trait;
use sqlx::SqlitePool;
use testorch_core::error::{AppError, Result};
use testorch_core::port::{Maintenance, MaintenanceStats};
use tracing::info;

pub struct SqliteMaintenance {
    pool: SqlitePool,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn get_db_size(&self) -> Result<f64> {
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to get page count: {e}")))?;

        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to get page size: {e}")))?;

        let size_bytes = page_count * page_size;
        Ok(size_bytes as f64 / (1024.0 * 1024.0))
    }
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn vacuum(&self) -> Result<f64> {
        info!("running VACUUM to optimize database");

        let size_before = self.get_db_size().await?;

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("VACUUM failed: {e}")))?;

        let size_after = self.get_db_size().await?;
        let reclaimed = (size_before - size_after).max(0.0);

        info!(
            size_before_mb = size_before,
            size_after_mb = size_after,
            reclaimed_mb = reclaimed,
            "VACUUM completed"
        );

        Ok(reclaimed)
    }

    async fn gc_terminal_jobs(&self, retention_days: i64) -> Result<i64> {
        let now_ms: i64 = sqlx::query_scalar("SELECT CAST(strftime('%s', 'now') AS INTEGER) * 1000")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to read current time: {e}")))?;
        let cutoff = now_ms - retention_days * 24 * 60 * 60 * 1000;

        let result = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE status IN ('COMPLETED', 'FAILED')
            AND completed_at IS NOT NULL
            AND completed_at < ?
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("terminal job GC failed: {e}")))?;

        let deleted = result.rows_affected() as i64;
        info!(deleted_jobs = deleted, "terminal job GC completed");
        Ok(deleted)
    }

    async fn gc_empty_groups(&self) -> Result<i64> {
        let result = sqlx::query(
            r#"
            DELETE FROM job_groups
            WHERE id NOT IN (SELECT group_id FROM jobs WHERE group_id IS NOT NULL)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("empty group GC failed: {e}")))?;

        let deleted = result.rows_affected() as i64;
        info!(deleted_groups = deleted, "empty group GC completed");
        Ok(deleted)
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        let db_size_mb = self.get_db_size().await?;
        let db_size_bytes = (db_size_mb * 1024.0 * 1024.0) as i64;

        let job_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to count jobs: {e}")))?;

        let terminal_job_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status IN ('COMPLETED', 'FAILED')")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::Internal(format!("failed to count terminal jobs: {e}")))?;

        let job_group_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_groups")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to count job groups: {e}")))?;

        Ok(MaintenanceStats {
            db_size_mb,
            db_size_bytes,
            job_count,
            terminal_job_count,
            job_group_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations, SqliteJobRepository};
    use testorch_core::domain::{Job, JobId, JobOutcome, JobStatus, Target};
    use testorch_core::port::JobRepository;

    fn job(id: &str, created_at: i64) -> Job {
        Job::new(
            JobId::new(id),
            "org",
            Some("v1".to_string()),
            None,
            "a.spec",
            1,
            Target::Emulator,
            None,
            None,
            created_at,
        )
    }

    #[tokio::test]
    async fn stats_reflect_empty_database() {
        let pool = create_pool(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let maintenance = SqliteMaintenance::new(pool);
        let stats = maintenance.get_stats().await.unwrap();

        assert!(stats.db_size_mb > 0.0);
        assert_eq!(stats.job_count, 0);
        assert_eq!(stats.terminal_job_count, 0);
    }

    #[tokio::test]
    async fn vacuum_does_not_error() {
        let pool = create_pool(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let maintenance = SqliteMaintenance::new(pool);
        let reclaimed = maintenance.vacuum().await.unwrap();
        assert!(reclaimed >= 0.0);
    }

    #[tokio::test]
    async fn gc_terminal_jobs_deletes_old_completed_rows() {
        let pool = create_pool(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let repo = SqliteJobRepository::new(pool.clone());
        let maintenance = SqliteMaintenance::new(pool);

        let mut stale = job("j1", 0);
        stale.status = JobStatus::Completed;
        stale.completed_at = Some(0);
        stale.outcome = Some(JobOutcome::default());
        repo.create_job(&stale).await.unwrap();

        let deleted = maintenance.gc_terminal_jobs(0).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(repo.get_job(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn gc_empty_groups_deletes_groups_with_no_members() {
        let pool = create_pool(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let repo = SqliteJobRepository::new(pool.clone());
        let maintenance = SqliteMaintenance::new(pool);

        let group = testorch_core::domain::JobGroup::new(
            testorch_core::domain::JobGroupId::new("g1"),
            Some("v1".to_string()),
            Target::Emulator,
            0,
        );
        repo.create_job_group(&group).await.unwrap();

        let deleted = maintenance.gc_empty_groups().await.unwrap();
        assert_eq!(deleted, 1);
    }
}
