use crate::engine::{StageReport, StageState};
use crate::error::StorageError;

pub mod implementations;
pub use implementations::*;

/// Persists stage state and execution history for the scheduler.
#[async_trait::async_trait]
pub trait ExecutionStorage: Send + Sync {
    async fn init(&self) -> Result<(), StorageError>;

    /// Creates (or resets) a pending record for the stage.
    async fn create_stage_record(
        &self,
        execution_id: &str,
        stage_id: &str,
    ) -> Result<(), StorageError>;

    async fn update_stage_state(
        &self,
        execution_id: &str,
        stage_id: &str,
        state: StageState,
        attempts: usize,
    ) -> Result<(), StorageError>;

    async fn record_result(&self, report: &StageReport) -> Result<(), StorageError>;

    /// All stages of an execution, ordered by stage id.
    async fn get_execution_history(
        &self,
        execution_id: &str,
    ) -> Result<Vec<StageReport>, StorageError>;
}
