// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to keep stack, change set and event ids apart.

mod id;
mod stack_name;

pub use id::{ChangeSetId, EventId, StackId};
pub use stack_name::{StackName, StackNameError};
