// ABOUTME: Error type for content-addressed uploads.
// ABOUTME: Local read failures, storage failures and unparseable URLs.

use std::path::PathBuf;

use crate::provider::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to check for existing object {key}: {source}")]
    Exists {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to upload {} to {key}: {source}", path.display())]
    Put {
        path: PathBuf,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("not a storage URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}
