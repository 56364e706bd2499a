// ABOUTME: The deploy command's flow over the orchestrator.
// ABOUTME: Create, wait, optionally stop early, execute, wait and stream.

use serde::Serialize;
use tracing::info;

use crate::provider::{ChangeSetDescription, StackOps, StackSnapshot};
use crate::stream::{EventSink, EventStreamer, SeenEvents};

use super::error::DeployError;
use super::orchestrator::Orchestrator;
use super::request::DeploymentRequest;

/// How a deploy ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "result", rename_all = "snake_case")]
pub enum DeployOutcome {
    /// The change set had no changes; the current stack is returned.
    Unchanged(StackSnapshot),
    /// The change set was created but not executed.
    ChangeSetCreated(ChangeSetDescription),
    /// The change set was executed and the stack reached a good status.
    Deployed(StackSnapshot),
}

impl DeployOutcome {
    pub fn stack(&self) -> Option<&StackSnapshot> {
        match self {
            DeployOutcome::Unchanged(stack) | DeployOutcome::Deployed(stack) => Some(stack),
            DeployOutcome::ChangeSetCreated(_) => None,
        }
    }
}

/// Run a full deploy.
///
/// With a streamer, the events that exist before execution are recorded
/// first so only events caused by this deploy reach the sink.
pub async fn run_deploy<P: StackOps>(
    orchestrator: &Orchestrator<P>,
    streamer: Option<&EventStreamer<P>>,
    sink: &mut dyn EventSink,
    request: &DeploymentRequest,
) -> Result<DeployOutcome, DeployError> {
    let submitted = orchestrator.create_change_set(request).await?;

    let ready = match orchestrator.wait_for_change_set(submitted).await {
        Ok(ready) => ready,
        Err(err) if err.is_empty_changeset() && !request.fail_on_empty_changeset => {
            info!(stack = %request.stack_name, "No changes to deploy");
            let stack = orchestrator.describe_stack(&request.stack_name).await?;
            return Ok(DeployOutcome::Unchanged(stack));
        }
        Err(err) => return Err(err),
    };

    if request.no_execute_changeset {
        return Ok(DeployOutcome::ChangeSetCreated(ready.into_description()));
    }

    let mut ready = ready;
    if let Some(streamer) = streamer {
        let existing = streamer
            .describe_new_events(ready.stack_name(), &SeenEvents::new())
            .await
            .map_err(DeployError::Streaming)?;
        ready.set_known_events(existing.into_iter().collect());
    }

    let executing = orchestrator.execute_change_set(ready).await?;
    let stack = orchestrator
        .wait_for_execute(executing, streamer.map(|s| (s, sink)))
        .await?;
    Ok(DeployOutcome::Deployed(stack))
}
