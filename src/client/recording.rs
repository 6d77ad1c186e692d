use async_trait::async_trait;
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{CorrelationHandle, ExecutionClient};
use crate::error::TaskError;
use crate::operation::OperationBatch;

/// In-memory ExecutionClient for testing
///
/// Records every submission and hands out sequential handles. Failures can
/// be scripted per call with [`fail_next`](Self::fail_next) or for every
/// call with [`always_fail`](Self::always_fail).
#[derive(Clone, Default)]
pub struct RecordingExecutionClient {
    submissions: Arc<Mutex<Vec<(String, OperationBatch)>>>,
    scripted_failures: Arc<Mutex<VecDeque<TaskError>>>,
    permanent_failure: Arc<Mutex<Option<TaskError>>>,
}

impl RecordingExecutionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for the next submission.
    pub fn fail_next(&self, status: Option<u16>, cause: impl Into<String>) -> &Self {
        self.scripted_failures
            .lock()
            .unwrap()
            .push_back(TaskError::submission(status, cause));
        self
    }

    /// Fail every submission from now on.
    pub fn always_fail(&self, status: Option<u16>, cause: impl Into<String>) -> &Self {
        *self.permanent_failure.lock().unwrap() = Some(TaskError::submission(status, cause));
        self
    }

    /// Every accepted or rejected submission, in call order.
    pub fn submissions(&self) -> Vec<(String, OperationBatch)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl ExecutionClient for RecordingExecutionClient {
    async fn submit(
        &self,
        provider_type: &str,
        batch: OperationBatch,
    ) -> Result<CorrelationHandle, TaskError> {
        let sequence = {
            let mut submissions = self.submissions.lock().unwrap();
            submissions.push((provider_type.to_string(), batch));
            submissions.len()
        };

        let failure = self
            .scripted_failures
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.permanent_failure.lock().unwrap().clone());
        if let Some(err) = failure {
            warn!("Rejecting submission {} for '{}': {}", sequence, provider_type, err);
            return Err(err);
        }

        let handle = CorrelationHandle::new(format!("task-{}", sequence));
        debug!("Accepted submission {} for '{}' as {}", sequence, provider_type, handle);
        Ok(handle)
    }
}
