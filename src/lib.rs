//! # Stage Tasks
//!
//! Retryable, asynchronous tasks for a pipeline engine. A task turns a
//! stage's declarative context into a batch of provider-neutral
//! operations, submits it to a remote operations service, and reports a
//! correlation handle back instead of waiting for the operations to
//! finish. The scheduler re-invokes tasks according to the backoff and
//! timeout each one declares.
//!
//! ## Features
//!
//! - Deterministic operation batch construction
//! - Pluggable execution clients, with a recording client for tests
//! - Declarative backoff/timeout policies
//! - A reference scheduler that enforces those policies
//! - Execution history persistence (in-memory or SQLite)
//!
//! ## Example
//!
//! ```rust
//! use stage_tasks::storage::implementations::MemoryStorage;
//! use stage_tasks::{DeleteSnapshotTask, RecordingExecutionClient, Scheduler, StageExecution, StageState};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Arc::new(RecordingExecutionClient::new());
//!     let task = DeleteSnapshotTask::new(client);
//!
//!     let mut stage = StageExecution::from_json(
//!         "stage-1",
//!         "deleteSnapshot",
//!         json!({
//!             "snapshotIds": ["snap-1", "snap-2"],
//!             "credentials": "acct-a",
//!             "region": "us-east-1",
//!             "cloudProvider": "aws"
//!         }),
//!     )
//!     .unwrap();
//!
//!     let scheduler = Scheduler::new("execution-1", Arc::new(MemoryStorage::new()));
//!     let report = scheduler.run_stage(&task, &mut stage).await.unwrap();
//!     assert_eq!(report.state, StageState::Succeeded);
//! }
//! ```
//!
//! ## License
//!
//! Licensed under the MIT license. See the [LICENSE](LICENSE) file for details.

pub mod client;
pub mod engine;
pub mod error;
pub mod operation;
pub mod stage;
pub mod storage;
pub mod task;
pub mod tasks;

pub use client::{CorrelationHandle, ExecutionClient, RecordingExecutionClient};
pub use engine::{FailureReason, Scheduler, SchedulerOptions, StageReport, StageState};
pub use error::{StorageError, TaskError};
pub use operation::{OperationBatch, OperationBatchBuilder, OperationDescriptor, OperationRequest};
pub use stage::{DeleteSnapshotRequest, StageExecution};
pub use storage::ExecutionStorage;
pub use task::{ExecutionStatus, RetryableTask, SubmissionFailurePolicy, TaskOutcome, TaskPolicy};
pub use tasks::DeleteSnapshotTask;
