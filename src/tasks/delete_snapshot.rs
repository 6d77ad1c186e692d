use async_trait::async_trait;
use log::{info, warn};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use super::outputs;
use crate::client::ExecutionClient;
use crate::error::TaskError;
use crate::operation::builder::DELETE_SNAPSHOT;
use crate::operation::{OperationBatchBuilder, OperationRequest};
use crate::stage::{DeleteSnapshotRequest, StageExecution};
use crate::task::{ExecutionStatus, RetryableTask, SubmissionFailurePolicy, TaskOutcome, TaskPolicy};

pub const DEFAULT_BACKOFF_PERIOD: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Submits one `deleteSnapshot` operation per snapshot id in the stage.
pub struct DeleteSnapshotTask {
    client: Arc<dyn ExecutionClient>,
    builder: OperationBatchBuilder,
    policy: TaskPolicy,
    on_submission_failure: SubmissionFailurePolicy,
}

impl DeleteSnapshotTask {
    pub fn new(client: Arc<dyn ExecutionClient>) -> Self {
        Self {
            client,
            builder: OperationBatchBuilder::delete_snapshot(),
            policy: TaskPolicy::new(DEFAULT_BACKOFF_PERIOD, DEFAULT_TIMEOUT),
            on_submission_failure: SubmissionFailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TaskPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_submission_failure_policy(mut self, value: SubmissionFailurePolicy) -> Self {
        self.on_submission_failure = value;
        self
    }

    fn request_outputs(request: &OperationRequest) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(outputs::NOTIFICATION_TYPE.into(), DELETE_SNAPSHOT.into());
        map.insert(outputs::DELETE_REGION.into(), request.region().into());
        map.insert(
            outputs::DELETE_ACCOUNT_NAME.into(),
            request.credentials().into(),
        );
        map
    }
}

#[async_trait]
impl RetryableTask for DeleteSnapshotTask {
    fn name(&self) -> &str {
        DELETE_SNAPSHOT
    }

    fn policy(&self) -> TaskPolicy {
        self.policy
    }

    async fn execute(&self, stage: &StageExecution) -> Result<TaskOutcome, TaskError> {
        let request = stage
            .map_to::<DeleteSnapshotRequest>()?
            .into_operation_request();
        let batch = self.builder.build(&request)?;
        let operation_count = batch.len();

        match self.client.submit(request.provider_type(), batch).await {
            Ok(handle) => {
                info!(
                    "Stage '{}': submitted {} {} operation(s) to '{}' as {}",
                    stage.id,
                    operation_count,
                    DELETE_SNAPSHOT,
                    request.provider_type(),
                    handle
                );
                Ok(TaskOutcome::succeeded()
                    .with_outputs(Self::request_outputs(&request))
                    .with_output(outputs::LAST_TASK_ID, serde_json::to_value(&handle)?))
            }
            Err(err) => {
                warn!("Stage '{}': submission failed: {}", stage.id, err);
                let status = match self.on_submission_failure {
                    SubmissionFailurePolicy::Propagate => return Err(err),
                    SubmissionFailurePolicy::Fail => ExecutionStatus::Failed,
                    SubmissionFailurePolicy::Retry => ExecutionStatus::Running,
                };
                Ok(TaskOutcome::new(status)
                    .with_outputs(Self::request_outputs(&request))
                    .with_output(outputs::EXCEPTION_TYPE, err.kind())
                    .with_output(outputs::EXCEPTION_MESSAGE, err.to_string()))
            }
        }
    }
}
