use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::engine::{StageReport, StageState};
use crate::error::StorageError;
use crate::storage::ExecutionStorage;

type StageKey = (String, String);

/// In-memory implementation of ExecutionStorage for testing
#[derive(Clone, Default)]
pub struct MemoryStorage {
    stages: Arc<Mutex<HashMap<StageKey, StageReport>>>,
    update_calls: Arc<Mutex<Vec<(String, StageState, usize)>>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state of a stage
    pub fn get_stage_state(&self, execution_id: &str, stage_id: &str) -> Option<(StageState, usize)> {
        self.stages
            .lock()
            .unwrap()
            .get(&(execution_id.to_string(), stage_id.to_string()))
            .map(|report| (report.state, report.attempts))
    }

    /// Get all state updates made to this storage
    pub fn get_update_calls(&self) -> Vec<(String, StageState, usize)> {
        self.update_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionStorage for MemoryStorage {
    async fn init(&self) -> Result<(), StorageError> {
        // Nothing to initialize for in-memory storage
        Ok(())
    }

    async fn create_stage_record(
        &self,
        execution_id: &str,
        stage_id: &str,
    ) -> Result<(), StorageError> {
        self.stages.lock().unwrap().insert(
            (execution_id.to_string(), stage_id.to_string()),
            StageReport::pending(execution_id, stage_id),
        );
        Ok(())
    }

    async fn update_stage_state(
        &self,
        execution_id: &str,
        stage_id: &str,
        state: StageState,
        attempts: usize,
    ) -> Result<(), StorageError> {
        self.update_calls
            .lock()
            .unwrap()
            .push((stage_id.to_string(), state, attempts));

        let mut stages = self.stages.lock().unwrap();
        match stages.get_mut(&(execution_id.to_string(), stage_id.to_string())) {
            Some(report) => {
                report.state = state;
                report.attempts = attempts;
                Ok(())
            }
            None => Err(StorageError::NotFound(stage_id.to_string())),
        }
    }

    async fn record_result(&self, report: &StageReport) -> Result<(), StorageError> {
        self.update_calls
            .lock()
            .unwrap()
            .push((report.stage_id.clone(), report.state, report.attempts));

        let key = (report.execution_id.clone(), report.stage_id.clone());
        let mut stages = self.stages.lock().unwrap();
        if !stages.contains_key(&key) {
            return Err(StorageError::NotFound(report.stage_id.clone()));
        }
        stages.insert(key, report.clone());
        Ok(())
    }

    async fn get_execution_history(
        &self,
        execution_id: &str,
    ) -> Result<Vec<StageReport>, StorageError> {
        let stages = self.stages.lock().unwrap();
        let mut history: Vec<StageReport> = stages
            .iter()
            .filter(|((eid, _), _)| eid == execution_id)
            .map(|(_, report)| report.clone())
            .collect();
        history.sort_by(|a, b| a.stage_id.cmp(&b.stage_id));
        Ok(history)
    }
}
