//! SDK Request/Response Types
//!
//! Mirrors the JSON-RPC types from the `api-rpc` crate.

use serde::{Deserialize, Serialize};

/// Request to submit a new job
#[derive(Debug, Clone, Serialize)]
pub struct SubmitJobRequest {
    pub org: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    pub test_path: String,
    #[serde(default)]
    pub priority: i32,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub status: String,
}

/// Request to read a job's current status
#[derive(Debug, Clone, Serialize)]
pub struct GetJobStatusRequest {
    pub job_id: String,
}

#[derive(Debug, Clone, Deserialize)]
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

/// Request to register an agent by capability
#[derive(Debug, Clone, Serialize)]
pub struct RegisterAgentRequest {
    pub hostname: String,
    pub capability: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAgentResponse {
    pub agent_id: String,
}

/// Request to claim the next scheduled job for a capability
#[derive(Debug, Clone, Serialize)]
pub struct FetchJobRequest {
    pub capability: String,
}

#[derive(Debug, Clone, Deserialize)]
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

/// Request to report a job's transition, optionally with its terminal
/// outcome
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateJobStatusRequest {
    pub job_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateJobStatusResponse {
    pub success: bool,
}
