//! RPC Method Handlers
//!
//! Thin translation between the JSON-RPC wire types and the core
//! application services (SS, DI).

use std::sync::Arc;

use jsonrpsee::types::ErrorObjectOwned;

use crate::error::to_rpc_error;
use crate::types::{
    FetchJobRequest, FetchJobResponse, GetJobStatusRequest, GetJobStatusResponse,
    RegisterAgentRequest, RegisterAgentResponse, SubmitJobRequest, SubmitJobResponse,
    UpdateJobStatusRequest, UpdateJobStatusResponse,
};
use testorch_core::application::dispatch::DispatchService;
use testorch_core::application::submission::{SubmissionService, SubmitRequest};
use testorch_core::domain::{AgentId, JobId, JobOutcome, JobStatus};
use testorch_core::error::AppError;

/// RPC handler with injected dependencies. Holds the two application
/// services directly rather than the ports they wrap -- validation and
/// idempotency/cache bookkeeping belong to SS/DI, not this layer.
pub struct RpcHandler {
    submission: Arc<SubmissionService>,
    dispatch: Arc<DispatchService>,
}

impl RpcHandler {
    pub fn new(submission: Arc<SubmissionService>, dispatch: Arc<DispatchService>) -> Self {
        Self { submission, dispatch }
    }

    /// dev.submit.v1
    pub async fn submit_job(
        &self,
        params: SubmitJobRequest,
    ) -> Result<SubmitJobResponse, ErrorObjectOwned> {
        let req = SubmitRequest {
            org: params.org,
            artifact: params.artifact,
            web_url: params.web_url,
            test_path: params.test_path,
            priority: params.priority,
            target: params.target,
            test_kind: params.test_kind,
            idempotency_token: params.idempotency_token,
        };

        let result = self.submission.submit(req).await.map_err(to_rpc_error)?;

        Ok(SubmitJobResponse {
            job_id: result.job_id.0,
            status: result.status.as_str().to_string(),
        })
    }

    /// dev.status.v1
    pub async fn get_job_status(
        &self,
        params: GetJobStatusRequest,
    ) -> Result<GetJobStatusResponse, ErrorObjectOwned> {
        let job_id = JobId::new(params.job_id);
        let job = self.submission.get_status(&job_id).await.map_err(to_rpc_error)?;
        let outcome = job.outcome.unwrap_or_default();

        Ok(GetJobStatusResponse {
            job_id: job.id.0,
            status: job.status.as_str().to_string(),
            created_at: job.created_at,
            completed_at: job.completed_at,
            session_id: outcome.session_id,
            logs_url: outcome.logs_url,
            video_url: outcome.video_url,
            error_message: outcome.error_message,
            duration_seconds: outcome.duration_seconds,
        })
    }

    /// agent.register.v1
    pub async fn register_agent(
        &self,
        params: RegisterAgentRequest,
    ) -> Result<RegisterAgentResponse, ErrorObjectOwned> {
        let agent_id = self
            .dispatch
            .register_agent(&params.hostname, &params.capability)
            .await
            .map_err(to_rpc_error)?;

        Ok(RegisterAgentResponse {
            agent_id: agent_id.0,
        })
    }

    /// agent.fetch.v1
    pub async fn fetch_job(
        &self,
        params: FetchJobRequest,
    ) -> Result<FetchJobResponse, ErrorObjectOwned> {
        let job = self.dispatch.fetch_job(&params.capability).await.map_err(to_rpc_error)?;

        Ok(FetchJobResponse {
            job_id: job.id.0,
            org: job.org,
            artifact: job.artifact,
            web_url: job.web_url,
            test_path: job.test_path,
            priority: job.priority,
            target: job.target.as_str().to_string(),
            test_kind: job.test_kind.map(|k| k.as_str().to_string()),
        })
    }

    /// agent.update_status.v1
    pub async fn update_job_status(
        &self,
        params: UpdateJobStatusRequest,
    ) -> Result<UpdateJobStatusResponse, ErrorObjectOwned> {
        let job_id = JobId::new(params.job_id);
        let status = JobStatus::parse(&params.status).ok_or_else(|| {
            to_rpc_error(AppError::InvalidArgument(format!(
                "unrecognized status: {}",
                params.status
            )))
        })?;
        let agent_id = params.agent_id.map(AgentId::new);

        let outcome = if params.session_id.is_some()
            || params.logs_url.is_some()
            || params.video_url.is_some()
            || params.error_message.is_some()
            || params.duration_seconds.is_some()
        {
            Some(JobOutcome {
                session_id: params.session_id,
                logs_url: params.logs_url,
                video_url: params.video_url,
                error_message: params.error_message,
                duration_seconds: params.duration_seconds,
            })
        } else {
            None
        };

        self.dispatch
            .update_job_status(&job_id, status, agent_id.as_ref(), outcome)
            .await
            .map_err(to_rpc_error)?;

        Ok(UpdateJobStatusResponse { success: true })
    }
}
