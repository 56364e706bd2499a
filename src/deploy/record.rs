// ABOUTME: Change set record parameterized by lifecycle state.
// ABOUTME: Created by create_change_set and consumed step by step by the orchestrator.

use crate::provider::{ChangeSetDescription, ChangeSetType};
use crate::stream::SeenEvents;
use crate::types::{ChangeSetId, StackName};

use super::state::{Executing, Ready, Submitted};

/// A change set in progress, parameterized by its current state.
///
/// The inferred change set type travels with the record so the execute
/// step waits for the matching terminal status.
#[derive(Debug)]
pub struct ChangeSetRecord<S> {
    pub(crate) stack_name: StackName,
    pub(crate) id: ChangeSetId,
    pub(crate) change_set_type: ChangeSetType,
    pub(crate) known_events: SeenEvents,
    pub(crate) state: S,
}

impl ChangeSetRecord<Submitted> {
    pub fn new(stack_name: StackName, id: ChangeSetId, change_set_type: ChangeSetType) -> Self {
        ChangeSetRecord {
            stack_name,
            id,
            change_set_type,
            known_events: SeenEvents::new(),
            state: Submitted,
        }
    }
}

impl<S> ChangeSetRecord<S> {
    pub fn stack_name(&self) -> &StackName {
        &self.stack_name
    }

    pub fn id(&self) -> &ChangeSetId {
        &self.id
    }

    pub fn change_set_type(&self) -> ChangeSetType {
        self.change_set_type
    }

    /// Stack events that existed before execution; they are not streamed.
    pub fn known_events(&self) -> &SeenEvents {
        &self.known_events
    }

    pub fn set_known_events(&mut self, events: SeenEvents) {
        self.known_events = events;
    }

    pub(crate) fn transition<T>(self, state: T) -> ChangeSetRecord<T> {
        ChangeSetRecord {
            stack_name: self.stack_name,
            id: self.id,
            change_set_type: self.change_set_type,
            known_events: self.known_events,
            state,
        }
    }
}

impl ChangeSetRecord<Ready> {
    pub fn description(&self) -> &ChangeSetDescription {
        &self.state.description
    }

    pub fn into_description(self) -> ChangeSetDescription {
        self.state.description
    }
}

impl ChangeSetRecord<Executing> {
    pub fn description(&self) -> &ChangeSetDescription {
        &self.state.description
    }
}
