// Job Group entity: a batch of jobs sharing (artifact, target).

use serde::{Deserialize, Serialize};

use crate::domain::ids::{AgentId, JobGroupId};
use crate::domain::job::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobGroupStatus {
    Scheduled,
    Completed,
}

impl JobGroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobGroupStatus::Scheduled => "SCHEDULED",
            JobGroupStatus::Completed => "COMPLETED",
        }
    }
}

/// A batch of jobs dispatched together because they share the same
/// application artifact and execution target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobGroup {
    pub id: JobGroupId,
    pub artifact: Option<String>,
    pub target: Target,
    pub status: JobGroupStatus,
    pub owning_agent: Option<AgentId>,
    pub created_at: i64,
}

impl JobGroup {
    pub fn new(id: JobGroupId, artifact: Option<String>, target: Target, created_at: i64) -> Self {
        Self {
            id,
            artifact,
            target,
            status: JobGroupStatus::Scheduled,
            owning_agent: None,
            created_at,
        }
    }

    /// Two jobs belong to the same group iff this key is equal for both.
    pub fn key(artifact: &Option<String>, target: Target) -> (Option<String>, Target) {
        (artifact.clone(), target)
    }
}
