use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduling contract a task declares and the scheduler enforces.
///
/// `backoff_period` is the minimum delay before re-invoking a task that
/// returned `Running`; `timeout` bounds the wall time across all
/// invocations of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PolicyMillis", into = "PolicyMillis")]
pub struct TaskPolicy {
    pub backoff_period: Duration,
    pub timeout: Duration,
}

impl TaskPolicy {
    pub fn new(backoff_period: Duration, timeout: Duration) -> Self {
        Self {
            backoff_period,
            timeout,
        }
    }

    pub fn from_millis(backoff_period_ms: u64, timeout_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(backoff_period_ms),
            Duration::from_millis(timeout_ms),
        )
    }

    pub fn with_backoff_period(mut self, value: Duration) -> Self {
        self.backoff_period = value;
        self
    }

    pub fn with_timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }

    pub fn backoff_period_ms(&self) -> u64 {
        self.backoff_period.as_millis() as u64
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

#[derive(Serialize, Deserialize)]
struct PolicyMillis {
    backoff_period_ms: u64,
    timeout_ms: u64,
}

impl From<PolicyMillis> for TaskPolicy {
    fn from(value: PolicyMillis) -> Self {
        TaskPolicy::from_millis(value.backoff_period_ms, value.timeout_ms)
    }
}

impl From<TaskPolicy> for PolicyMillis {
    fn from(value: TaskPolicy) -> Self {
        PolicyMillis {
            backoff_period_ms: value.backoff_period_ms(),
            timeout_ms: value.timeout_ms(),
        }
    }
}

/// What a task reports when the backend rejects its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionFailurePolicy {
    /// Return the `Submission` error; the scheduler retries it until timeout.
    #[default]
    Propagate,
    /// Return a terminal `Failed` outcome with diagnostics.
    Fail,
    /// Return `Running` with diagnostics so the task is invoked again.
    Retry,
}
