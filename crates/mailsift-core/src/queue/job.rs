//! Job records owned by the processing queue.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EmailId, UserId};

/// Deduplication key: at most one non-terminal job may exist per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    /// Owning user.
    pub user_id: UserId,
    /// Provider message identifier.
    pub email_id: EmailId,
}

impl JobKey {
    /// Builds a key from its parts.
    #[must_use]
    pub const fn new(user_id: UserId, email_id: EmailId) -> Self {
        Self { user_id, email_id }
    }
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.email_id)
    }
}

/// Lifecycle state of one queued job.
///
/// `Pending → Fetching → Classifying → Succeeded`; either in-flight state
/// may fall to `Failed` (terminal) or `QuotaWait` (returns to `Pending`
/// once the wait elapses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting to be dispatched.
    Pending,
    /// Fetching the message from the mail provider.
    Fetching,
    /// Calling the text-generation provider and persisting.
    Classifying,
    /// Done; result persisted.
    Succeeded,
    /// Terminal failure; see `last_error`.
    Failed,
    /// Waiting out a provider quota window.
    QuotaWait,
}

impl JobState {
    /// Stable lowercase name, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Classifying => "classifying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::QuotaWait => "quota_wait",
        }
    }

    /// True for states that end the job's lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota condition surfaced to the caller, with enough detail to drive a
/// countdown or retry affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaNotice {
    /// Human-readable description of the quota condition.
    pub message: String,
    /// How long to wait before retrying.
    pub retry_after: Duration,
    /// Description of the exceeded limit, when the provider supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_limit: Option<String>,
    /// Link to the provider's quota documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_url: Option<String>,
}

/// One unit of classification work, owned exclusively by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueJob {
    /// Deduplication key.
    pub key: JobKey,
    /// Current lifecycle state.
    pub state: JobState,
    /// Dispatch attempts so far.
    pub attempts: u32,
    /// When the job was enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// Earliest time the job may be dispatched again; `None` means now.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_eligible_at: Option<DateTime<Utc>>,
    /// Full failure detail for operators. User-visible messaging is derived
    /// separately and never includes this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Set on terminal failure when the user must reconnect their account.
    #[serde(default)]
    pub needs_reauth: bool,
    /// Most recent quota condition, while in `QuotaWait`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaNotice>,
}

impl QueueJob {
    /// Creates a fresh `Pending` job.
    #[must_use]
    pub const fn new(key: JobKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            state: JobState::Pending,
            attempts: 0,
            enqueued_at: now,
            next_eligible_at: None,
            last_error: None,
            needs_reauth: false,
            quota: None,
        }
    }

    /// True once the job has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// True when `next_eligible_at` is unset or has elapsed at `now`.
    #[must_use]
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.next_eligible_at.is_none_or(|at| at <= now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn key() -> JobKey {
        JobKey::new(UserId::from("u1"), EmailId::from("m1"))
    }

    #[test]
    fn test_new_job_is_pending_and_eligible() {
        let now = Utc::now();
        let job = QueueJob::new(key(), now);
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.attempts, 0);
        assert!(job.is_eligible(now));
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_eligibility_respects_next_eligible_at() {
        let now = Utc::now();
        let mut job = QueueJob::new(key(), now);
        job.next_eligible_at = Some(now + TimeDelta::seconds(30));

        assert!(!job.is_eligible(now));
        assert!(!job.is_eligible(now + TimeDelta::seconds(29)));
        assert!(job.is_eligible(now + TimeDelta::seconds(30)));
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::QuotaWait.is_terminal());
        assert!(!JobState::Fetching.is_terminal());
        assert!(!JobState::Classifying.is_terminal());
    }
}
