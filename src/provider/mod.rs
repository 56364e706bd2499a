// ABOUTME: Capability traits and records for the remote orchestration and storage APIs.
// ABOUTME: Defines StackOps, StorageOps, their errors, and the AWS SDK adapter.

mod aws;
mod error;
pub mod sentinel;
mod shared_types;
mod stack_ops;
mod storage_ops;

pub use aws::{AwsProvider, DEFAULT_REGION};
pub use error::{StackError, StorageError};
pub use shared_types::*;
pub use stack_ops::StackOps;
pub use storage_ops::StorageOps;
