// ABOUTME: Object storage operations trait.
// ABOUTME: Only existence checks and streaming uploads are needed.

use async_trait::async_trait;

use super::error::StorageError;
use super::shared_types::PutObjectRequest;

/// Object storage used for templates and packaged artifacts.
#[async_trait]
pub trait StorageOps: Send + Sync {
    /// Metadata-only existence check.
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Stream a local file to `bucket/key` with server-side encryption.
    async fn put_object(&self, request: PutObjectRequest<'_>) -> Result<(), StorageError>;
}
