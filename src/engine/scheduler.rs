use futures::future::join_all;
use log::{debug, error, info, warn};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Instant};

use super::options::SchedulerOptions;
use super::stage_state::{FailureReason, StageReport, StageState};
use crate::error::StorageError;
use crate::stage::StageExecution;
use crate::storage::ExecutionStorage;
use crate::task::{ExecutionStatus, RetryableTask, TaskPolicy};
use crate::tasks::outputs::EXCEPTION_MESSAGE;

/// Drives retryable tasks to a terminal state under their declared policy.
///
/// A stage is invoked, and while it reports `Running` (or a retryable
/// error) it is invoked again after the backoff period. Once the elapsed
/// time since the first invocation reaches the timeout the stage fails with
/// [`FailureReason::TimeoutExceeded`], including when an invocation itself
/// has not returned by then.
pub struct Scheduler {
    execution_id: String,
    storage: Arc<dyn ExecutionStorage>,
    options: SchedulerOptions,
}

impl Scheduler {
    pub fn new(execution_id: impl Into<String>, storage: Arc<dyn ExecutionStorage>) -> Self {
        Self {
            execution_id: execution_id.into(),
            storage,
            options: SchedulerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SchedulerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    fn policy_for(&self, task: &dyn RetryableTask) -> TaskPolicy {
        self.options.policy_override.unwrap_or_else(|| task.policy())
    }

    pub async fn run_stage(
        &self,
        task: &dyn RetryableTask,
        stage: &mut StageExecution,
    ) -> Result<StageReport, StorageError> {
        self.storage
            .create_stage_record(&self.execution_id, &stage.id)
            .await?;

        let started = Instant::now();
        let mut attempts = 0;
        let mut outputs = Map::new();
        let mut last_error: Option<String> = None;

        loop {
            let policy = self.policy_for(task);
            attempts += 1;
            info!(
                "Stage '{}' invoking task '{}' (attempt {})",
                stage.id,
                task.name(),
                attempts
            );
            self.update_state(&stage.id, StageState::Running, attempts)
                .await;

            // The call only gets what is left of the stage's budget.
            let remaining = policy.timeout.saturating_sub(started.elapsed());
            let result = match timeout(remaining, task.execute(stage)).await {
                Ok(result) => result,
                Err(_) => {
                    error!(
                        "Stage '{}' invocation {} did not return before the timeout",
                        stage.id, attempts
                    );
                    let reason = Self::timeout_reason(&policy, started, last_error);
                    return self
                        .finish(stage, StageState::Failed, attempts, Some(reason), outputs)
                        .await;
                }
            };

            match result {
                Ok(outcome) => {
                    let message = outcome
                        .outputs
                        .get(EXCEPTION_MESSAGE)
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    stage.merge_outputs(&outcome.outputs);
                    outputs.extend(outcome.outputs);
                    match outcome.status {
                        ExecutionStatus::Succeeded => {
                            info!("Stage '{}' succeeded after {} attempt(s)", stage.id, attempts);
                            return self
                                .finish(stage, StageState::Succeeded, attempts, None, outputs)
                                .await;
                        }
                        ExecutionStatus::Failed => {
                            error!("Stage '{}' reported failure", stage.id);
                            let reason = FailureReason::TaskReported { message };
                            return self
                                .finish(stage, StageState::Failed, attempts, Some(reason), outputs)
                                .await;
                        }
                        ExecutionStatus::Running => {
                            debug!("Stage '{}' still running", stage.id);
                            last_error = message;
                        }
                    }
                }
                Err(err) if err.is_retryable() => {
                    warn!(
                        "Stage '{}' failed on attempt {} with retryable error: {}",
                        stage.id, attempts, err
                    );
                    last_error = Some(err.to_string());
                }
                Err(err) => {
                    error!("Stage '{}' failed permanently: {}", stage.id, err);
                    let reason = FailureReason::Error {
                        kind: err.kind().to_string(),
                        message: err.to_string(),
                    };
                    return self
                        .finish(stage, StageState::Failed, attempts, Some(reason), outputs)
                        .await;
                }
            }

            if let Some(max_attempts) = self.options.max_attempts {
                if attempts >= max_attempts {
                    error!("Stage '{}' gave up after {} attempts", stage.id, attempts);
                    let reason = FailureReason::AttemptsExhausted {
                        attempts,
                        last_error,
                    };
                    return self
                        .finish(stage, StageState::Failed, attempts, Some(reason), outputs)
                        .await;
                }
            }

            let elapsed = started.elapsed();
            if elapsed + policy.backoff_period >= policy.timeout {
                // No further invocation fits; fail once the deadline passes.
                sleep(policy.timeout.saturating_sub(elapsed)).await;
                error!(
                    "Stage '{}' timed out after {:?} ({} attempt(s))",
                    stage.id,
                    started.elapsed(),
                    attempts
                );
                let reason = Self::timeout_reason(&policy, started, last_error);
                return self
                    .finish(stage, StageState::Failed, attempts, Some(reason), outputs)
                    .await;
            }

            debug!(
                "Re-invoking stage '{}' after {:?}",
                stage.id, policy.backoff_period
            );
            sleep(policy.backoff_period).await;
        }
    }

    fn timeout_reason(
        policy: &TaskPolicy,
        started: Instant,
        last_error: Option<String>,
    ) -> FailureReason {
        FailureReason::TimeoutExceeded {
            timeout_ms: policy.timeout_ms(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            last_error,
        }
    }

    /// Runs unrelated stages concurrently; reports keep the input order.
    pub async fn run_stages(
        &self,
        stages: Vec<(Arc<dyn RetryableTask>, StageExecution)>,
    ) -> Result<Vec<(StageExecution, StageReport)>, StorageError> {
        info!(
            "Execution '{}': running {} stage(s)",
            self.execution_id,
            stages.len()
        );

        let runs = stages.into_iter().map(|(task, mut stage)| async move {
            let report = self.run_stage(task.as_ref(), &mut stage).await?;
            Ok::<_, StorageError>((stage, report))
        });

        join_all(runs).await.into_iter().collect()
    }

    async fn update_state(&self, stage_id: &str, state: StageState, attempts: usize) {
        if let Err(e) = self
            .storage
            .update_stage_state(&self.execution_id, stage_id, state, attempts)
            .await
        {
            error!("Error updating state for stage '{}': {}", stage_id, e);
        }
    }

    async fn finish(
        &self,
        stage: &StageExecution,
        state: StageState,
        attempts: usize,
        failure: Option<FailureReason>,
        outputs: Map<String, Value>,
    ) -> Result<StageReport, StorageError> {
        let report = StageReport {
            execution_id: self.execution_id.clone(),
            stage_id: stage.id.clone(),
            state,
            attempts,
            failure,
            outputs,
        };
        if let Err(e) = self.storage.record_result(&report).await {
            error!("Error recording result for stage '{}': {}", stage.id, e);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests;
