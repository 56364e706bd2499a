// ABOUTME: Change set deployment using the type state pattern.
// ABOUTME: Exports state markers, the change set record, the orchestrator and the deploy pipeline.

mod error;
mod orchestrator;
mod pipeline;
mod record;
mod request;
mod state;

pub use crate::provider::ChangeSetType;
pub use error::{DeployError, DeployErrorKind};
pub use orchestrator::{DEFAULT_CHANGESET_PREFIX, Orchestrator};
pub use pipeline::{DeployOutcome, run_deploy};
pub use record::ChangeSetRecord;
pub use request::{DeploymentRequest, StackPresence, merge_parameters};
pub use state::{Executing, Ready, Submitted};
