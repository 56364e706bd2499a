// ABOUTME: Error types for the change set lifecycle.
// ABOUTME: Empty change sets and blocked stacks are distinct so callers can decide.

use std::path::PathBuf;

use crate::provider::{StackError, StackStatus};
use crate::stream::StreamError;
use crate::types::ChangeSetId;
use crate::upload::UploadError;

/// Errors that can occur while deploying a change set.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// A provider call failed.
    #[error("failed to {operation}: {source}")]
    Provider {
        operation: &'static str,
        #[source]
        source: StackError,
    },

    /// The change set failed to compute for a reason other than "no changes".
    #[error("change set {change_set} failed: {reason}")]
    ChangeSetFailed {
        change_set: ChangeSetId,
        reason: String,
        #[source]
        source: StackError,
    },

    /// The change set contains no changes.
    #[error("change set {change_set} for stack {stack} contains no changes: {reason}")]
    EmptyChangeset {
        stack: String,
        change_set: ChangeSetId,
        reason: String,
    },

    /// The stack failed its first creation and must be replaced.
    #[error("stack {stack} is in {status} and can't be updated unless forced")]
    StackBlocked { stack: String, status: StackStatus },

    #[error("failed to delete stack {stack}: {source}")]
    Deletion {
        stack: String,
        #[source]
        source: StackError,
    },

    #[error("failed to execute change set {change_set}: {source}")]
    Execution {
        change_set: ChangeSetId,
        #[source]
        source: StackError,
    },

    /// The stack did not reach a successful terminal status.
    #[error("failed {action} stack {stack}, status: {status}")]
    StackFailed {
        action: &'static str,
        stack: String,
        status: StackStatus,
    },

    /// The stack vanished while it was expected to exist.
    #[error("stack {0} does not exist")]
    StackMissing(String),

    #[error("event streaming failed: {0}")]
    Streaming(#[source] StreamError),

    #[error("template upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("failed to read {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// Provider call failed.
    Provider,
    /// Change set had nothing to do.
    EmptyChangeset,
    /// Stack needs force deploy.
    StackBlocked,
    /// Deleting a blocked stack failed.
    Deletion,
    /// Executing the change set failed.
    Execution,
    /// Stack ended in a failure status.
    StackFailed,
    /// Event streaming failed.
    Streaming,
    /// Template upload failed.
    Upload,
    /// Reading a local file failed.
    LocalIo,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Provider { .. }
            | DeployError::ChangeSetFailed { .. }
            | DeployError::StackMissing(_) => DeployErrorKind::Provider,
            DeployError::EmptyChangeset { .. } => DeployErrorKind::EmptyChangeset,
            DeployError::StackBlocked { .. } => DeployErrorKind::StackBlocked,
            DeployError::Deletion { .. } => DeployErrorKind::Deletion,
            DeployError::Execution { .. } => DeployErrorKind::Execution,
            DeployError::StackFailed { .. } => DeployErrorKind::StackFailed,
            DeployError::Streaming(_) => DeployErrorKind::Streaming,
            DeployError::Upload(_) => DeployErrorKind::Upload,
            DeployError::LocalIo { .. } => DeployErrorKind::LocalIo,
        }
    }

    pub fn is_empty_changeset(&self) -> bool {
        self.kind() == DeployErrorKind::EmptyChangeset
    }

    pub(crate) fn provider(operation: &'static str) -> impl FnOnce(StackError) -> Self {
        move |source| DeployError::Provider { operation, source }
    }
}
