// ABOUTME: Error type for stack event streaming.
// ABOUTME: Any poll failure ends the streaming session.

use crate::provider::StackError;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("failed to describe events for stack {stack}: {source}")]
    DescribeEvents {
        stack: String,
        #[source]
        source: StackError,
    },
}
