//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results for the client-facing and
//! agent-facing surfaces (section 6).

use serde::{Deserialize, Serialize};

/// dev.submit.v1 - Submit a job
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub org: String,
    pub artifact: Option<String>,
    pub web_url: Option<String>,
    pub test_path: String,
    #[serde(default)]
    pub priority: i32,
    pub target: String,
    pub test_kind: Option<String>,
    pub idempotency_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub status: String,
}

/// dev.status.v1 - Read a job's current status and outcome
#[derive(Debug, Deserialize)]
pub struct GetJobStatusRequest {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetJobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub session_id: Option<String>,
    pub logs_url: Option<String>,
    pub video_url: Option<String>,
    pub error_message: Option<String>,
    pub duration_seconds: Option<i64>,
}

/// agent.register.v1 - Register a new agent by capability
#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    pub hostname: String,
    pub capability: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterAgentResponse {
    pub agent_id: String,
}

/// agent.fetch.v1 - Claim the next scheduled job for a capability
#[derive(Debug, Deserialize)]
pub struct FetchJobRequest {
    pub capability: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchJobResponse {
    pub job_id: String,
    pub org: String,
    pub artifact: Option<String>,
    pub web_url: Option<String>,
    pub test_path: String,
    pub priority: i32,
    pub target: String,
    pub test_kind: Option<String>,
}

/// agent.update_status.v1 - Report a job's transition, optionally with
/// its terminal outcome
#[derive(Debug, Deserialize)]
pub struct UpdateJobStatusRequest {
    pub job_id: String,
    pub status: String,
    pub agent_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub logs_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateJobStatusResponse {
    pub success: bool,
}
