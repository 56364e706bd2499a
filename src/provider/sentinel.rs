// ABOUTME: Provider response strings that drive control flow.
// ABOUTME: The only place raw provider wording is matched; everything else sees typed values.

use super::shared_types::StatusReason;

/// Status reason the provider attaches to a change set that has nothing to do.
pub const NO_CHANGES_REASON: &str = "The submitted information didn't contain changes.";

/// Message the provider returns from DescribeStacks for an unknown stack.
pub fn stack_missing_message(stack_name: &str) -> String {
    format!("Stack with id {stack_name} does not exist")
}

/// Whether a DescribeStacks error message means "no such stack".
pub fn is_stack_missing(message: &str, stack_name: &str) -> bool {
    message.contains(&stack_missing_message(stack_name))
}

impl StatusReason {
    /// Classify a raw change set status reason.
    pub fn classify(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.contains(NO_CHANGES_REASON) {
            StatusReason::NoChanges(raw)
        } else {
            StatusReason::Other(raw)
        }
    }
}
