// Job entity: identity, state machine, and outcome fields.

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};
use crate::domain::ids::{JobGroupId, JobId};

/// Execution target capability. Partitions both jobs and agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Emulator,
    Device,
    Browserstack,
    Web,
}

impl Target {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "emulator" => Some(Target::Emulator),
            "device" => Some(Target::Device),
            "browserstack" => Some(Target::Browserstack),
            "web" => Some(Target::Web),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Emulator => "emulator",
            Target::Device => "device",
            Target::Browserstack => "browserstack",
            Target::Web => "web",
        }
    }
}

/// Test automation framework driving the job. `None` means unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestKind {
    Playwright,
    Espresso,
}

impl TestKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PLAYWRIGHT" => Some(TestKind::Playwright),
            "ESPRESSO" => Some(TestKind::Espresso),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Playwright => "PLAYWRIGHT",
            TestKind::Espresso => "ESPRESSO",
        }
    }
}

/// Job status. Edges are enumerated in `JobStatus::can_transition_to`;
/// anything not listed there is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Scheduled,
    Assigned,
    Running,
    Completed,
    Failed,
    Retrying,
}

impl JobStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(JobStatus::Pending),
            "SCHEDULED" => Some(JobStatus::Scheduled),
            "ASSIGNED" => Some(JobStatus::Assigned),
            "RUNNING" => Some(JobStatus::Running),
            "COMPLETED" => Some(JobStatus::Completed),
            "FAILED" => Some(JobStatus::Failed),
            "RETRYING" => Some(JobStatus::Retrying),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Scheduled => "SCHEDULED",
            JobStatus::Assigned => "ASSIGNED",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Retrying => "RETRYING",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// The state machine in section 4.4: everything not listed here is invalid.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Scheduled)
                | (Scheduled, Assigned)
                | (Assigned, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Retrying)
                | (Retrying, Scheduled)
        )
    }
}

/// Terminal outcome fields, set atomically with the status write that
/// moves a job into COMPLETED or FAILED.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobOutcome {
    pub session_id: Option<String>,
    pub logs_url: Option<String>,
    pub video_url: Option<String>,
    pub error_message: Option<String>,
    pub duration_seconds: Option<i64>,
}

/// One test execution request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub org: String,
    /// Application artifact reference. Required unless `target == Web`.
    pub artifact: Option<String>,
    /// Web URL under test. Required when `target == Web`.
    pub web_url: Option<String>,
    pub test_path: String,
    pub priority: i32,
    pub target: Target,
    pub test_kind: Option<TestKind>,
    pub idempotency_token: Option<String>,
    pub created_at: i64,
    pub status: JobStatus,
    pub group_id: Option<JobGroupId>,
    pub completed_at: Option<i64>,
    pub outcome: Option<JobOutcome>,
    /// Number of times the reaper has reclaimed this job from a dead
    /// agent's ASSIGNED/RUNNING claim back to SCHEDULED. Not part of the
    /// state machine; used only to cap reclaims before the reaper gives
    /// up and fails the job (section 7 leaves the cap to deployment).
    #[serde(default)]
    pub reclaim_count: i32,
    /// Timestamp of the last status write this job received (claim,
    /// agent-reported transition, or reclaim). The reaper's staleness
    /// check is "ASSIGNED/RUNNING and never updated since" rather than a
    /// join through a per-job agent id, since `FetchJob` claims a job
    /// without naming the claiming agent.
    pub last_activity_at: i64,
}

impl Job {
    /// Construct a brand-new job in `PENDING`. Callers supply the id and
    /// timestamp so generation stays under the caller's
    /// `IdProvider`/`TimeProvider`, keeping this constructor pure.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: JobId,
        org: impl Into<String>,
        artifact: Option<String>,
        web_url: Option<String>,
        test_path: impl Into<String>,
        priority: i32,
        target: Target,
        test_kind: Option<TestKind>,
        idempotency_token: Option<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            org: org.into(),
            artifact,
            web_url,
            test_path: test_path.into(),
            priority,
            target,
            test_kind,
            idempotency_token,
            created_at,
            status: JobStatus::Pending,
            group_id: None,
            completed_at: None,
            outcome: None,
            reclaim_count: 0,
            last_activity_at: created_at,
        }
    }

    /// Enforce the state machine. Does not persist; callers write the
    /// returned state through their repository in the same operation
    /// that computed it legal.
    pub fn transition_to(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                entity: "job",
                id: self.id.to_string(),
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Move into SCHEDULED as part of a batch promotion, recording the
    /// group it was assigned to.
    pub fn promote(&mut self, group_id: JobGroupId) -> Result<()> {
        self.transition_to(JobStatus::Scheduled)?;
        self.group_id = Some(group_id);
        Ok(())
    }

    /// Reaper-only transition (section 7): a job stuck in ASSIGNED or
    /// RUNNING whose owning agent's heartbeat expired moves back to
    /// SCHEDULED, or to FAILED once `max_reclaims` has been exceeded.
    /// This bypasses `can_transition_to` because it is not an
    /// agent-driven edge; it is the liveness sweep's own exception.
    pub fn reclaim(&mut self, max_reclaims: i32, now: i64) -> Result<()> {
        if !matches!(self.status, JobStatus::Assigned | JobStatus::Running) {
            return Err(DomainError::FailedPrecondition(format!(
                "cannot reclaim job {} from {}",
                self.id,
                self.status.as_str()
            )));
        }
        self.reclaim_count += 1;
        if self.reclaim_count > max_reclaims {
            self.status = JobStatus::Failed;
            self.completed_at = Some(now);
            self.outcome = Some(JobOutcome {
                error_message: Some(format!(
                    "reclaimed {} times by the liveness sweep; giving up",
                    self.reclaim_count
                )),
                ..Default::default()
            });
        } else {
            self.status = JobStatus::Scheduled;
        }
        self.last_activity_at = now;
        Ok(())
    }

    /// Move into a terminal state with its outcome, atomically.
    pub fn complete_with(
        &mut self,
        next: JobStatus,
        outcome: JobOutcome,
        completed_at: i64,
    ) -> Result<()> {
        if !next.is_terminal() {
            return Err(DomainError::InvalidArgument(format!(
                "{} is not a terminal status",
                next.as_str()
            )));
        }
        self.transition_to(next)?;
        self.outcome = Some(outcome);
        self.completed_at = Some(completed_at);
        self.last_activity_at = completed_at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_job() -> Job {
        Job::new(
            JobId::new("job-1"),
            "org-a",
            Some("v1".to_string()),
            None,
            "a.spec",
            5,
            Target::Emulator,
            None,
            Some("tok-1".to_string()),
            1_000,
        )
    }

    #[test]
    fn lifecycle_happy_path() {
        let mut job = pending_job();
        assert_eq!(job.status, JobStatus::Pending);

        job.promote(JobGroupId::new("grp-1")).unwrap();
        assert_eq!(job.status, JobStatus::Scheduled);
        assert_eq!(job.group_id, Some(JobGroupId::new("grp-1")));

        job.transition_to(JobStatus::Assigned).unwrap();
        job.transition_to(JobStatus::Running).unwrap();

        job.complete_with(
            JobStatus::Completed,
            JobOutcome {
                session_id: Some("s1".to_string()),
                ..Default::default()
            },
            2_000,
        )
        .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.completed_at, Some(2_000));
        assert!(job.outcome.is_some());
    }

    #[test]
    fn retry_reenters_scheduled() {
        let mut job = pending_job();
        job.promote(JobGroupId::new("grp-1")).unwrap();
        job.transition_to(JobStatus::Assigned).unwrap();
        job.transition_to(JobStatus::Running).unwrap();
        job.transition_to(JobStatus::Retrying).unwrap();
        job.transition_to(JobStatus::Scheduled).unwrap();
        assert_eq!(job.status, JobStatus::Scheduled);
    }

    #[test]
    fn invalid_transition_is_refused() {
        let mut job = pending_job();
        job.promote(JobGroupId::new("grp-1")).unwrap();
        job.transition_to(JobStatus::Assigned).unwrap();

        let err = job.transition_to(JobStatus::Pending).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        // Row is unchanged.
        assert_eq!(job.status, JobStatus::Assigned);
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut job = pending_job();
        job.promote(JobGroupId::new("grp-1")).unwrap();
        job.transition_to(JobStatus::Assigned).unwrap();
        job.transition_to(JobStatus::Running).unwrap();
        job.complete_with(JobStatus::Failed, JobOutcome::default(), 5_000)
            .unwrap();

        assert!(job.transition_to(JobStatus::Retrying).is_err());
        assert!(job.transition_to(JobStatus::Scheduled).is_err());
    }

    #[test]
    fn reclaim_returns_to_scheduled_until_cap_then_fails() {
        let mut job = pending_job();
        job.promote(JobGroupId::new("grp-1")).unwrap();
        job.transition_to(JobStatus::Assigned).unwrap();

        job.reclaim(2, 9_000).unwrap();
        assert_eq!(job.status, JobStatus::Scheduled);
        assert_eq!(job.reclaim_count, 1);

        job.transition_to(JobStatus::Assigned).unwrap();
        job.reclaim(2, 9_100).unwrap();
        assert_eq!(job.status, JobStatus::Scheduled);

        job.transition_to(JobStatus::Assigned).unwrap();
        job.reclaim(2, 9_200).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.completed_at, Some(9_200));
    }

    #[test]
    fn reclaim_refuses_non_claimed_jobs() {
        let mut job = pending_job();
        assert!(job.reclaim(2, 1_000).is_err());
    }
}
