use async_trait::async_trait;

pub mod outcome;
pub mod policy;

pub use outcome::{ExecutionStatus, TaskOutcome};
pub use policy::{SubmissionFailurePolicy, TaskPolicy};

use crate::error::TaskError;
use crate::stage::StageExecution;

/// A unit of work the scheduler may invoke repeatedly for the same stage.
///
/// Each call is independent: implementations hold no per-stage state
/// between invocations and never block on remote completion. Returning
/// `Running` asks to be invoked again after the policy's backoff period.
#[async_trait]
pub trait RetryableTask: Send + Sync {
    fn name(&self) -> &str;

    fn policy(&self) -> TaskPolicy;

    async fn execute(&self, stage: &StageExecution) -> Result<TaskOutcome, TaskError>;
}
