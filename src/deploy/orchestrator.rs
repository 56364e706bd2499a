// ABOUTME: Change set lifecycle: presence check, submit, wait, execute, wait for the stack.
// ABOUTME: Each step consumes the record in one state and returns it in the next.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::provider::{
    ChangeSetInput, ChangeSetType, StackError, StackOps, StackSnapshot, TemplateSource,
};
use crate::stream::{EventSink, EventStreamer};
use crate::types::StackName;

use super::error::DeployError;
use super::record::ChangeSetRecord;
use super::request::{DeploymentRequest, StackPresence, merge_parameters};
use super::state::{Executing, Ready, Submitted};

/// Prefix for generated change set names when none is configured.
pub const DEFAULT_CHANGESET_PREFIX: &str = "stratus-deploy";

/// Drives change sets through their lifecycle against a stack provider.
pub struct Orchestrator<P> {
    provider: Arc<P>,
    changeset_prefix: String,
}

impl<P: StackOps> Orchestrator<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            changeset_prefix: DEFAULT_CHANGESET_PREFIX.to_string(),
        }
    }

    pub fn with_changeset_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.changeset_prefix = prefix.into();
        self
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Classify the target stack.
    ///
    /// A missing stack and a stack that only holds a change set under review
    /// both count as absent. Any other describe failure is returned.
    pub async fn determine_presence(
        &self,
        stack: &StackName,
    ) -> Result<StackPresence, DeployError> {
        let snapshot = match self.provider.describe_stack(stack).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) | Err(StackError::NotFound(_)) => return Ok(StackPresence::Absent),
            Err(source) => {
                return Err(DeployError::Provider {
                    operation: "describe stack",
                    source,
                });
            }
        };

        let presence = if snapshot.status.is_review_only() {
            StackPresence::Absent
        } else if snapshot.status.is_failed_creation() {
            StackPresence::Blocked(snapshot)
        } else {
            StackPresence::Present(snapshot)
        };
        debug!(stack = %stack, ?presence, "Determined stack presence");
        Ok(presence)
    }

    /// Current snapshot of a stack that must exist.
    pub async fn describe_stack(&self, stack: &StackName) -> Result<StackSnapshot, DeployError> {
        match self.provider.describe_stack(stack).await {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) | Err(StackError::NotFound(_)) => {
                Err(DeployError::StackMissing(stack.to_string()))
            }
            Err(source) => Err(DeployError::Provider {
                operation: "describe stack",
                source,
            }),
        }
    }

    /// Submit a change set for the request.
    ///
    /// A stack whose first creation failed is deleted first when the request
    /// forces it, otherwise the call fails without submitting anything.
    pub async fn create_change_set(
        &self,
        request: &DeploymentRequest,
    ) -> Result<ChangeSetRecord<Submitted>, DeployError> {
        let stack = &request.stack_name;

        let (change_set_type, parameters) = match self.determine_presence(stack).await? {
            StackPresence::Absent => (ChangeSetType::Create, request.parameters.clone()),
            StackPresence::Blocked(snapshot) => {
                if !request.force_deploy {
                    return Err(DeployError::StackBlocked {
                        stack: stack.to_string(),
                        status: snapshot.status,
                    });
                }
                self.delete_blocked_stack(stack, &snapshot).await?;
                (ChangeSetType::Create, request.parameters.clone())
            }
            StackPresence::Present(snapshot) => (
                ChangeSetType::Update,
                merge_parameters(&request.parameters, &snapshot.parameters),
            ),
        };

        let template = self.resolve_template(request).await?;
        let change_set_name = format!("{}-{}", self.changeset_prefix, Utc::now().timestamp());
        let input = ChangeSetInput {
            stack_name: stack.clone(),
            change_set_name,
            change_set_type,
            description: change_set_description(),
            template,
            parameters,
            capabilities: request.capabilities.clone(),
            tags: request.tags.clone(),
            role_arn: request.role_arn.clone(),
            notification_arns: request.notification_arns.clone(),
        };

        let id = self
            .provider
            .create_change_set(&input)
            .await
            .map_err(DeployError::provider("create change set"))?;

        info!(
            stack = %stack,
            change_set = %id,
            change_set_type = %change_set_type,
            "Created change set"
        );
        Ok(ChangeSetRecord::new(stack.clone(), id, change_set_type))
    }

    async fn delete_blocked_stack(
        &self,
        stack: &StackName,
        snapshot: &StackSnapshot,
    ) -> Result<(), DeployError> {
        warn!(stack = %stack, status = %snapshot.status, "Deleting stack before recreating it");
        let deletion = |source| DeployError::Deletion {
            stack: stack.to_string(),
            source,
        };
        self.provider.delete_stack(stack).await.map_err(deletion)?;
        self.provider
            .wait_until_stack_deleted(stack)
            .await
            .map_err(deletion)?;
        debug!(stack = %stack, "Stack deleted");
        Ok(())
    }

    /// Uploaded URL when the request has an uploader, otherwise the file inline.
    async fn resolve_template(
        &self,
        request: &DeploymentRequest,
    ) -> Result<TemplateSource, DeployError> {
        let path = &request.template_file;
        match &request.uploader {
            Some(uploader) => {
                let url = uploader.upload_with_dedup(path, "template").await?;
                debug!(url = %url, "Template uploaded");
                Ok(TemplateSource::Url(url))
            }
            None => tokio::fs::read_to_string(path)
                .await
                .map(TemplateSource::Body)
                .map_err(|source| DeployError::LocalIo {
                    path: path.clone(),
                    source,
                }),
        }
    }

    /// Wait for the change set to finish computing.
    ///
    /// The description is fetched whether or not the wait succeeded; a failed
    /// wait whose reason says there are no changes becomes `EmptyChangeset`.
    pub async fn wait_for_change_set(
        &self,
        record: ChangeSetRecord<Submitted>,
    ) -> Result<ChangeSetRecord<Ready>, DeployError> {
        let stack = record.stack_name();
        let waited = self
            .provider
            .wait_until_change_set_ready(stack, record.id())
            .await;

        let description = self
            .provider
            .describe_change_set(stack, record.id())
            .await
            .map_err(DeployError::provider("describe change set"))?;

        if let Err(source) = waited {
            let reason = description
                .status_reason
                .as_ref()
                .map(|r| r.message().to_string())
                .unwrap_or_else(|| description.status.as_str().to_string());

            if description
                .status_reason
                .as_ref()
                .is_some_and(|r| r.is_no_changes())
            {
                debug!(stack = %stack, change_set = %record.id(), "Change set is empty");
                return Err(DeployError::EmptyChangeset {
                    stack: stack.to_string(),
                    change_set: record.id().clone(),
                    reason,
                });
            }
            return Err(DeployError::ChangeSetFailed {
                change_set: record.id().clone(),
                reason,
                source,
            });
        }

        debug!(
            stack = %stack,
            change_set = %record.id(),
            changes = description.changes.len(),
            "Change set ready"
        );
        Ok(record.transition(Ready { description }))
    }

    pub async fn execute_change_set(
        &self,
        record: ChangeSetRecord<Ready>,
    ) -> Result<ChangeSetRecord<Executing>, DeployError> {
        self.provider
            .execute_change_set(record.stack_name(), record.id())
            .await
            .map_err(|source| DeployError::Execution {
                change_set: record.id().clone(),
                source,
            })?;

        info!(stack = %record.stack_name(), change_set = %record.id(), "Executing change set");
        let description = record.state.description.clone();
        Ok(record.transition(Executing { description }))
    }

    /// Wait for the stack to reach the terminal status matching the change
    /// set type, streaming events to the sink meanwhile when a streamer is
    /// given. Returns once both the wait and the final drain have finished.
    ///
    /// A failed wait is reported with the stack's final status and takes
    /// precedence over a streaming failure.
    pub async fn wait_for_execute(
        &self,
        record: ChangeSetRecord<Executing>,
        streaming: Option<(&EventStreamer<P>, &mut dyn EventSink)>,
    ) -> Result<StackSnapshot, DeployError> {
        let stack = record.stack_name();
        let change_set_type = record.change_set_type();
        let (done_tx, done_rx) = oneshot::channel::<()>();

        let wait = async {
            let result = match change_set_type {
                ChangeSetType::Create => self.provider.wait_until_stack_created(stack).await,
                ChangeSetType::Update => self.provider.wait_until_stack_updated(stack).await,
            };
            let _ = done_tx.send(());
            result
        };

        let (waited, streamed) = match streaming {
            Some((streamer, sink)) => {
                let stream = streamer.start_streaming(
                    stack,
                    record.known_events().clone(),
                    sink,
                    done_rx,
                );
                let (waited, streamed) = tokio::join!(wait, stream);
                (waited, streamed.map(|_| ()))
            }
            None => {
                drop(done_rx);
                (wait.await, Ok(()))
            }
        };

        let snapshot = self.describe_stack(stack).await?;

        if let Err(source) = waited {
            debug!(stack = %stack, error = %source, "Stack wait failed");
            return Err(DeployError::StackFailed {
                action: match change_set_type {
                    ChangeSetType::Create => "creating",
                    ChangeSetType::Update => "updating",
                },
                stack: stack.to_string(),
                status: snapshot.status,
            });
        }
        streamed.map_err(DeployError::Streaming)?;

        info!(stack = %stack, status = %snapshot.status, "Stack operation finished");
        Ok(snapshot)
    }
}

/// Who created the change set, from where, and when.
fn change_set_description() -> String {
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    format!(
        "Created by {} {} on {} at {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        host,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}
