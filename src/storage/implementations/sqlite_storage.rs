use async_trait::async_trait;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};

use crate::engine::{FailureReason, StageReport, StageState};
use crate::error::StorageError;
use crate::storage::ExecutionStorage;

pub struct SqliteStorage {
    pub pool: Pool<Sqlite>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Single-connection in-memory database; every pooled connection would
    /// otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    fn report_from_row(row: &SqliteRow) -> Result<StageReport, StorageError> {
        let stage_id: String = row.try_get("stage_id")?;
        let state: String = row.try_get("state")?;
        let state = StageState::from_str(&state).ok_or_else(|| {
            StorageError::InvalidState(format!("stage '{}' has state '{}'", stage_id, state))
        })?;
        let attempts: i64 = row.try_get("attempts")?;
        let attempts = usize::try_from(attempts).map_err(|_| {
            StorageError::InvalidState(format!(
                "stage '{}' has attempt count {}",
                stage_id, attempts
            ))
        })?;
        let failure: Option<String> = row.try_get("failure")?;
        let failure = failure
            .map(|json| serde_json::from_str::<FailureReason>(&json))
            .transpose()?;
        let outputs: String = row.try_get("outputs")?;

        Ok(StageReport {
            execution_id: row.try_get("execution_id")?,
            stage_id,
            state,
            attempts,
            failure,
            outputs: serde_json::from_str(&outputs)?,
        })
    }
}

#[async_trait]
impl ExecutionStorage for SqliteStorage {
    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stages (
                execution_id TEXT NOT NULL,
                stage_id TEXT NOT NULL,
                state TEXT NOT NULL,
                attempts INTEGER NOT NULL,
                failure TEXT,
                outputs TEXT NOT NULL DEFAULT '{}',
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (execution_id, stage_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_stage_record(
        &self,
        execution_id: &str,
        stage_id: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO stages (execution_id, stage_id, state, attempts, failure, outputs)
            VALUES (?, ?, 'pending', 0, NULL, '{}')
            "#,
        )
        .bind(execution_id)
        .bind(stage_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_stage_state(
        &self,
        execution_id: &str,
        stage_id: &str,
        state: StageState,
        attempts: usize,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE stages
            SET state = ?, attempts = ?, updated_at = CURRENT_TIMESTAMP
            WHERE execution_id = ? AND stage_id = ?
            "#,
        )
        .bind(state.as_str())
        .bind(attempts as i64)
        .bind(execution_id)
        .bind(stage_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(stage_id.to_string()));
        }
        Ok(())
    }

    async fn record_result(&self, report: &StageReport) -> Result<(), StorageError> {
        let failure = report
            .failure
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let outputs = serde_json::to_string(&report.outputs)?;

        let result = sqlx::query(
            r#"
            UPDATE stages
            SET state = ?, attempts = ?, failure = ?, outputs = ?, updated_at = CURRENT_TIMESTAMP
            WHERE execution_id = ? AND stage_id = ?
            "#,
        )
        .bind(report.state.as_str())
        .bind(report.attempts as i64)
        .bind(failure)
        .bind(outputs)
        .bind(report.execution_id.as_str())
        .bind(report.stage_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(report.stage_id.clone()));
        }
        Ok(())
    }

    async fn get_execution_history(
        &self,
        execution_id: &str,
    ) -> Result<Vec<StageReport>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT execution_id, stage_id, state, attempts, failure, outputs
            FROM stages
            WHERE execution_id = ?
            ORDER BY stage_id
            "#,
        )
        .bind(execution_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::report_from_row).collect()
    }
}
