use log::info;
use serde_json::json;
use std::sync::Arc;

use stage_tasks::storage::implementations::SqliteStorage;
use stage_tasks::{
    DeleteSnapshotTask, ExecutionStorage, RecordingExecutionClient, RetryableTask, Scheduler,
    StageExecution,
};

const DATABASE_URL_VAR: &str = "STAGE_TASKS_DATABASE_URL";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    // Step 1: Set up the storage backend.
    let storage = match std::env::var(DATABASE_URL_VAR) {
        Ok(url) => {
            info!("Using execution history at {}", url);
            SqliteStorage::new(&url).await?
        }
        Err(_) => SqliteStorage::in_memory().await?,
    };
    let storage = Arc::new(storage);
    storage.init().await?;

    // Step 2: Wire the task to an execution client.
    let client = Arc::new(RecordingExecutionClient::new());
    let delete_snapshots: Arc<dyn RetryableTask> = Arc::new(DeleteSnapshotTask::new(client.clone()));

    let stages = vec![
        StageExecution::from_json(
            "delete-old-snapshots",
            "deleteSnapshot",
            json!({
                "snapshotIds": ["snap-1", "snap-2"],
                "credentials": "acct-a",
                "region": "us-east-1",
                "cloudProvider": "aws"
            }),
        )?,
        StageExecution::from_json(
            "delete-without-account",
            "deleteSnapshot",
            json!({
                "snapshotIds": ["snap-3"],
                "region": "us-west-2",
                "cloudProvider": "aws"
            }),
        )?,
    ];

    // Step 3: Run the stages.
    let scheduler = Scheduler::new("execution-1", storage.clone());
    let runs = stages
        .into_iter()
        .map(|stage| (delete_snapshots.clone(), stage))
        .collect();
    scheduler.run_stages(runs).await?;

    // Step 4: Report execution history.
    println!("Execution history:");
    for report in storage.get_execution_history("execution-1").await? {
        match &report.failure {
            Some(reason) => println!(
                "  Stage {}: {} after {} attempt(s): {}",
                report.stage_id, report.state, report.attempts, reason
            ),
            None => println!(
                "  Stage {}: {} after {} attempt(s)",
                report.stage_id, report.state, report.attempts
            ),
        }
    }
    println!("Submitted {} batch(es)", client.submission_count());

    Ok(())
}
