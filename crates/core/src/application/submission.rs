// Submission Service (SS): validates and enqueues new jobs, serves
// status reads, idempotency (section 4.3).

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Job, JobId, JobStatus, Target, TestKind};
use crate::error::{AppError, Result};
use crate::port::{CoordinationStore, IdProvider, JobRepository, TimeProvider};

const IDEMPOTENCY_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const STATUS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub org: String,
    pub artifact: Option<String>,
    pub web_url: Option<String>,
    pub test_path: String,
    pub priority: i32,
    pub target: String,
    pub test_kind: Option<String>,
    pub idempotency_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResult {
    pub job_id: JobId,
    pub status: JobStatus,
}

pub struct SubmissionService {
    job_repo: Arc<dyn JobRepository>,
    coordination: Arc<dyn CoordinationStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SubmissionService {
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

    pub async fn submit(&self, req: SubmitRequest) -> Result<SubmitResult> {
        let (target, test_kind) = validate_submit_request(&req)?;

        if let Some(token) = req.idempotency_token.as_deref() {
            match self.coordination.is_idempotent(token).await {
                Ok(true) => {
                    return Err(AppError::AlreadyExists(format!(
                        "idempotency token already used: {token}"
                    )))
                }
                Ok(false) => {}
                Err(e) => {
                    // Fail-open on the cache: the unique partial index on
                    // idempotency_token is the secondary safety net.
                    warn!(error = ?e, token, "idempotency check failed, proceeding");
                }
            }
        }

        let id = JobId::new(self.id_provider.generate_id());
        let now = self.time_provider.now_millis();

        let job = Job::new(
            id,
            req.org,
            req.artifact,
            req.web_url,
            req.test_path,
            req.priority,
            target,
            test_kind,
            req.idempotency_token.clone(),
            now,
        );

        let created = self.job_repo.create_job(&job).await?;

        if let Some(token) = req.idempotency_token.as_deref() {
            if let Err(e) = self.coordination.mark_idempotent(token, IDEMPOTENCY_TTL).await {
                warn!(error = ?e, job_id = %created.id, "failed to mark idempotency token");
            }
        }
        if let Err(e) = self.coordination.push_ingestion(&created.id).await {
            warn!(error = ?e, job_id = %created.id, "failed to push ingestion hint; scheduler scan will still pick it up");
        }

        Ok(SubmitResult {
            job_id: created.id,
            status: created.status,
        })
    }

    pub async fn get_status(&self, id: &JobId) -> Result<Job> {
        if id.as_str().trim().is_empty() {
            return Err(AppError::InvalidArgument("job id must not be empty".to_string()));
        }

        // Probe the shadow cache; PS stays the source of truth for the
        // full record (section 9: cache as shadow, not truth).
        let _ = self.coordination.get_status_cache(id).await;

        let job = self
            .job_repo
            .get_job(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job not found: {id}")))?;

        if let Err(e) = self
            .coordination
            .set_status_cache(id, job.status, STATUS_CACHE_TTL)
            .await
        {
            warn!(error = ?e, job_id = %id, "failed to refresh status cache");
        }

        Ok(job)
    }
}

const MAX_ORG_LEN: usize = 128;
const MAX_TEST_PATH_LEN: usize = 1024;
const MIN_PRIORITY: i32 = 0;
const MAX_PRIORITY: i32 = 10;

/// Validate a submit request. All failures are `InvalidArgument`.
fn validate_submit_request(req: &SubmitRequest) -> Result<(Target, Option<TestKind>)> {
    if req.org.trim().is_empty() {
        return Err(AppError::InvalidArgument("organization must not be empty".to_string()));
    }
    if req.org.len() > MAX_ORG_LEN {
        return Err(AppError::InvalidArgument(format!(
            "organization too long (max {MAX_ORG_LEN} chars, got {})",
            req.org.len()
        )));
    }

    if req.test_path.trim().is_empty() {
        return Err(AppError::InvalidArgument("test path must not be empty".to_string()));
    }
    if req.test_path.len() > MAX_TEST_PATH_LEN {
        return Err(AppError::InvalidArgument(format!(
            "test path too long (max {MAX_TEST_PATH_LEN} chars, got {})",
            req.test_path.len()
        )));
    }

    if req.priority < MIN_PRIORITY || req.priority > MAX_PRIORITY {
        return Err(AppError::InvalidArgument(format!(
            "priority out of range (must be between {MIN_PRIORITY} and {MAX_PRIORITY}, got {})",
            req.priority
        )));
    }

    let target = Target::parse(&req.target)
        .ok_or_else(|| AppError::InvalidArgument(format!("unrecognized target: {}", req.target)))?;

    match target {
        Target::Web => {
            if req.web_url.as_deref().unwrap_or("").trim().is_empty() {
                return Err(AppError::InvalidArgument(
                    "web_url is required when target is web".to_string(),
                ));
            }
        }
        _ => {
            if req.artifact.as_deref().unwrap_or("").trim().is_empty() {
                return Err(AppError::InvalidArgument(
                    "artifact is required unless target is web".to_string(),
                ));
            }
        }
    }

    let test_kind = match req.test_kind.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            TestKind::parse(raw)
                .ok_or_else(|| AppError::InvalidArgument(format!("unrecognized test kind: {raw}")))?,
        ),
    };

    Ok((target, test_kind))
}
