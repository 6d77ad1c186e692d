use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TaskError;
use crate::operation::OperationRequest;

/// A pipeline stage as the scheduler hands it to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageExecution {
    pub id: String,
    pub stage_type: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl StageExecution {
    pub fn new(
        id: impl Into<String>,
        stage_type: impl Into<String>,
        context: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            stage_type: stage_type.into(),
            context,
        }
    }

    /// Build a stage from a JSON object literal.
    pub fn from_json(
        id: impl Into<String>,
        stage_type: impl Into<String>,
        context: Value,
    ) -> Result<Self, TaskError> {
        match context {
            Value::Object(map) => Ok(Self::new(id, stage_type, map)),
            other => Err(TaskError::mapping(format!(
                "stage context must be an object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Decode the stage context into a typed request.
    pub fn map_to<T: DeserializeOwned>(&self) -> Result<T, TaskError> {
        serde_json::from_value(Value::Object(self.context.clone())).map_err(|e| {
            TaskError::mapping(format!("stage '{}' ({}): {}", self.id, self.stage_type, e))
        })
    }

    /// Later outputs overwrite earlier keys.
    pub fn merge_outputs(&mut self, outputs: &Map<String, Value>) {
        for (key, value) in outputs {
            self.context.insert(key.clone(), value.clone());
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Context shape of a delete-snapshot stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSnapshotRequest {
    pub snapshot_ids: Vec<String>,
    pub credentials: String,
    pub region: String,
    pub cloud_provider: String,
}

impl DeleteSnapshotRequest {
    pub fn into_operation_request(self) -> OperationRequest {
        OperationRequest::new(
            self.snapshot_ids,
            self.credentials,
            self.region,
            self.cloud_provider,
        )
    }
}
