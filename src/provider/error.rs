// ABOUTME: Error types for orchestration and storage API calls.
// ABOUTME: Sentinel provider messages are already classified when these are built.

/// Errors from the stack orchestration API.
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    /// The provider reported that the stack does not exist.
    #[error("stack {0} does not exist")]
    NotFound(String),

    /// Any other API failure, tagged with the operation that produced it.
    #[error("{operation} failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    /// A wait-until primitive gave up or observed a failure state.
    #[error("waiting for {condition} failed: {message}")]
    Waiter {
        condition: &'static str,
        message: String,
    },
}

impl StackError {
    pub fn api(operation: &'static str, message: impl Into<String>) -> Self {
        StackError::Api {
            operation,
            message: message.into(),
        }
    }

    pub fn waiter(condition: &'static str, message: impl Into<String>) -> Self {
        StackError::Waiter {
            condition,
            message: message.into(),
        }
    }
}

/// Errors from the object storage API.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{operation} failed for s3://{bucket}/{key}: {message}")]
    Api {
        operation: &'static str,
        bucket: String,
        key: String,
        message: String,
    },

    #[error("failed to read upload source: {0}")]
    Io(#[from] std::io::Error),
}
