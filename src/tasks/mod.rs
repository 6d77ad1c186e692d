pub mod delete_snapshot;

pub use delete_snapshot::DeleteSnapshotTask;

/// Output keys downstream stages and notifications read.
pub mod outputs {
    pub const NOTIFICATION_TYPE: &str = "notification.type";
    pub const LAST_TASK_ID: &str = "kato.last.task.id";
    pub const DELETE_REGION: &str = "delete.region";
    pub const DELETE_ACCOUNT_NAME: &str = "delete.account.name";
    pub const EXCEPTION_TYPE: &str = "exception.type";
    pub const EXCEPTION_MESSAGE: &str = "exception.message";
}
