use thiserror::Error;

/// Errors a task invocation can report to the scheduler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Declarative input is incomplete or violates a request invariant.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Stage context could not be decoded into a typed request.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// The execution backend was unreachable or rejected the batch.
    #[error("submission failed{}: {}", status_suffix(.status), .cause)]
    Submission { status: Option<u16>, cause: String },
}

impl TaskError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping(msg.into())
    }

    pub fn submission(status: Option<u16>, cause: impl Into<String>) -> Self {
        Self::Submission {
            status,
            cause: cause.into(),
        }
    }

    /// Name surfaced in execution history.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::InvalidRequest(_) => "InvalidRequest",
            TaskError::Mapping(_) => "MappingError",
            TaskError::Submission { .. } => "SubmissionError",
        }
    }

    /// Only backend failures may clear up on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Submission { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {})", code),
        None => String::new(),
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::Mapping(err.to_string())
    }
}

/// Errors raised by an execution history backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stage '{0}' not found")]
    NotFound(String),

    #[error("invalid stored state: {0}")]
    InvalidState(String),
}
