use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
    Running,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Succeeded => "SUCCEEDED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Running => "RUNNING",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SUCCEEDED" => Some(ExecutionStatus::Succeeded),
            "FAILED" => Some(ExecutionStatus::Failed),
            "RUNNING" => Some(ExecutionStatus::Running),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status plus the outputs to merge into the stage context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub outputs: Map<String, Value>,
}

impl TaskOutcome {
    pub fn new(status: ExecutionStatus) -> Self {
        Self {
            status,
            outputs: Map::new(),
        }
    }

    pub fn succeeded() -> Self {
        Self::new(ExecutionStatus::Succeeded)
    }

    pub fn failed() -> Self {
        Self::new(ExecutionStatus::Failed)
    }

    pub fn running() -> Self {
        Self::new(ExecutionStatus::Running)
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn with_outputs(mut self, outputs: Map<String, Value>) -> Self {
        self.outputs.extend(outputs);
        self
    }

    pub fn output(&self, key: &str) -> Option<&Value> {
        self.outputs.get(key)
    }
}
