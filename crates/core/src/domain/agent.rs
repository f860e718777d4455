// Agent entity: a remote worker process that claims and executes jobs
// for one target capability.

use serde::{Deserialize, Serialize};

use crate::domain::ids::AgentId;
use crate::domain::job::Target;

/// Heartbeat freshness window PS uses as ground truth (invariant 5).
pub const HEARTBEAT_FRESHNESS_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Idle,
    Busy,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "IDLE",
            AgentStatus::Busy => "BUSY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub hostname: String,
    pub capability: Target,
    pub status: AgentStatus,
    pub last_heartbeat_at: i64,
}

impl Agent {
    pub fn new(id: AgentId, hostname: impl Into<String>, capability: Target, now: i64) -> Self {
        Self {
            id,
            hostname: hostname.into(),
            capability,
            status: AgentStatus::Idle,
            last_heartbeat_at: now,
        }
    }

    /// Invariant 5: eligible only while the heartbeat is younger than the
    /// freshness window (PS ground truth; CS supplies the fast path via
    /// `agent:heartbeat:<id>` key existence).
    pub fn is_alive(&self, now: i64) -> bool {
        now.saturating_sub(self.last_heartbeat_at) < HEARTBEAT_FRESHNESS_MS
    }
}
