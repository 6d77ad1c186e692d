use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::task::ExecutionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl StageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageState::Pending => "pending",
            StageState::Running => "running",
            StageState::Succeeded => "succeeded",
            StageState::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StageState::Pending),
            "running" => Some(StageState::Running),
            "succeeded" => Some(StageState::Succeeded),
            "failed" => Some(StageState::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StageState::Succeeded | StageState::Failed)
    }
}

impl From<ExecutionStatus> for StageState {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Succeeded => StageState::Succeeded,
            ExecutionStatus::Failed => StageState::Failed,
            ExecutionStatus::Running => StageState::Running,
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a stage ended in `Failed`, as shown in execution history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// The task itself returned `FAILED`.
    TaskReported { message: Option<String> },
    /// The task returned an error the scheduler does not retry.
    Error { kind: String, message: String },
    /// The stage stayed non-terminal past the task's timeout.
    TimeoutExceeded {
        timeout_ms: u64,
        elapsed_ms: u64,
        last_error: Option<String>,
    },
    /// The scheduler's attempt cap was reached before a terminal status.
    AttemptsExhausted {
        attempts: usize,
        last_error: Option<String>,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::TaskReported { message: Some(m) } => {
                write!(f, "task reported failure: {}", m)
            }
            FailureReason::TaskReported { message: None } => write!(f, "task reported failure"),
            FailureReason::Error { kind, message } => write!(f, "{}: {}", kind, message),
            FailureReason::TimeoutExceeded {
                timeout_ms,
                elapsed_ms,
                ..
            } => write!(
                f,
                "timeout exceeded: {} ms elapsed, limit {} ms",
                elapsed_ms, timeout_ms
            ),
            FailureReason::AttemptsExhausted { attempts, .. } => {
                write!(f, "gave up after {} attempt(s)", attempts)
            }
        }
    }
}

/// Final (or current) record of one stage in an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub execution_id: String,
    pub stage_id: String,
    pub state: StageState,
    pub attempts: usize,
    pub failure: Option<FailureReason>,
    pub outputs: Map<String, Value>,
}

impl StageReport {
    pub fn pending(execution_id: impl Into<String>, stage_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            stage_id: stage_id.into(),
            state: StageState::Pending,
            attempts: 0,
            failure: None,
            outputs: Map::new(),
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self.failure, Some(FailureReason::TimeoutExceeded { .. }))
    }
}
