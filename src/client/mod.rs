use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TaskError;
use crate::operation::OperationBatch;

pub mod recording;

pub use recording::RecordingExecutionClient;

/// Opaque id of an in-flight remote job. Serializes as `{"id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationHandle {
    id: String,
}

impl CorrelationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CorrelationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Dispatches operation batches to the remote operations service.
///
/// Submission does not wait for the operations to run and never retries;
/// callers get a handle or a `TaskError::Submission`.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn submit(
        &self,
        provider_type: &str,
        batch: OperationBatch,
    ) -> Result<CorrelationHandle, TaskError>;
}
