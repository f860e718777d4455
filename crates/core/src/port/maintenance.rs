// Persistent Store maintenance: optional janitor work, not required for
// correctness (section 3: "no explicit sweeper required for correctness;
// an optional janitor may archive").

use crate::error::Result;
use async_trait::async_trait;

/// Database maintenance statistics
#[derive(Debug, Clone)]
pub struct MaintenanceStats {
    pub db_size_mb: f64,
    pub db_size_bytes: i64,
    pub job_count: i64,
    pub terminal_job_count: i64,
    pub job_group_count: i64,
}

/// Maintenance configuration
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Retention period for terminal (COMPLETED/FAILED) jobs, in days.
    pub terminal_job_retention_days: i64,

    /// Maximum DB size before forcing VACUUM (MB)
    pub max_db_size_mb: f64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            terminal_job_retention_days: 7,
            max_db_size_mb: 1000.0,
        }
    }
}

/// Database maintenance operations
#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Run VACUUM to reclaim space and optimize DB. Returns space
    /// reclaimed in MB.
    async fn vacuum(&self) -> Result<f64>;

    /// Delete terminal jobs (and their now-empty groups) older than
    /// retention. Returns number of jobs deleted.
    async fn gc_terminal_jobs(&self, retention_days: i64) -> Result<i64>;

    /// Delete job groups with no remaining member jobs. Returns number
    /// of groups deleted.
    async fn gc_empty_groups(&self) -> Result<i64>;

    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// Run full maintenance (GC + VACUUM) based on config.
    async fn run_full_maintenance(&self, config: &MaintenanceConfig) -> Result<MaintenanceStats> {
        let stats_before = self.get_stats().await?;

        let deleted_jobs = self.gc_terminal_jobs(config.terminal_job_retention_days).await?;
        let deleted_groups = self.gc_empty_groups().await?;

        let reclaimed_mb = if stats_before.db_size_mb > config.max_db_size_mb {
            self.vacuum().await?
        } else {
            0.0
        };

        let stats_after = self.get_stats().await?;

        tracing::info!(
            deleted_jobs = deleted_jobs,
            deleted_groups = deleted_groups,
            reclaimed_mb = reclaimed_mb,
            db_size_mb = stats_after.db_size_mb,
            "maintenance completed"
        );

        Ok(stats_after)
    }
}
