// ABOUTME: Stack orchestration operations trait.
// ABOUTME: Describe, change set lifecycle, deletion, waiters and event pages.

use async_trait::async_trait;

use super::error::StackError;
use super::shared_types::{ChangeSetDescription, ChangeSetInput, StackEventPage, StackSnapshot};
use crate::types::{ChangeSetId, StackName};

/// The orchestration provider's control plane.
///
/// The `wait_until_*` methods block until the provider reports the target
/// state, using the provider's own bounded waiter. They return an error when
/// the waiter gives up or observes a failure state.
#[async_trait]
pub trait StackOps: Send + Sync {
    /// Describe a stack by name. `Ok(None)` when the provider returns no stack,
    /// `Err(StackError::NotFound)` when it reports the stack as missing.
    async fn describe_stack(&self, name: &StackName) -> Result<Option<StackSnapshot>, StackError>;

    /// Submit a change set; returns its id.
    async fn create_change_set(&self, input: &ChangeSetInput) -> Result<ChangeSetId, StackError>;

    async fn describe_change_set(
        &self,
        stack: &StackName,
        change_set: &ChangeSetId,
    ) -> Result<ChangeSetDescription, StackError>;

    async fn wait_until_change_set_ready(
        &self,
        stack: &StackName,
        change_set: &ChangeSetId,
    ) -> Result<(), StackError>;

    async fn execute_change_set(
        &self,
        stack: &StackName,
        change_set: &ChangeSetId,
    ) -> Result<(), StackError>;

    async fn delete_stack(&self, name: &StackName) -> Result<(), StackError>;

    async fn wait_until_stack_deleted(&self, name: &StackName) -> Result<(), StackError>;

    async fn wait_until_stack_created(&self, name: &StackName) -> Result<(), StackError>;

    async fn wait_until_stack_updated(&self, name: &StackName) -> Result<(), StackError>;

    /// Fetch one page of the stack's event history.
    async fn describe_stack_events(
        &self,
        name: &StackName,
        next_token: Option<&str>,
    ) -> Result<StackEventPage, StackError>;
}
