// ABOUTME: Change set state marker types for the type state pattern.
// ABOUTME: States carry what is known at that point, so later steps cannot run early.

use crate::provider::ChangeSetDescription;

/// Submitted: the provider accepted the change set; its status is not known yet.
/// Available actions: `wait_for_change_set()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Submitted;

/// Ready: the change set finished computing and has changes.
/// Available actions: `execute_change_set()`, or stop and report the description.
#[derive(Debug, Clone)]
pub struct Ready {
    pub(crate) description: ChangeSetDescription,
}

/// Executing: the provider is applying the change set.
/// Available actions: `wait_for_execute()`
#[derive(Debug, Clone)]
pub struct Executing {
    pub(crate) description: ChangeSetDescription,
}
