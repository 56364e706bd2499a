// ABOUTME: Content-addressed uploads of local files to object storage.
// ABOUTME: Keys derive from an MD5 of the content, so unchanged files upload once.

mod error;
mod location;

pub use error::UploadError;
pub use location::{build_url, url_to_canonical_path};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::provider::{DEFAULT_REGION, Encryption, PutObjectRequest, StorageOps};

const READ_CHUNK: usize = 64 * 1024;

/// Uploads local artifacts and maps their URLs back to bucket/key form.
///
/// Handed to the orchestrator and packager as an optional collaborator.
#[async_trait]
pub trait Upload: Send + Sync {
    /// Upload `path` under a content-derived key ending in `extension`,
    /// skipping the transfer when the object already exists. Returns the URL.
    async fn upload_with_dedup(&self, path: &Path, extension: &str) -> Result<String, UploadError>;

    /// Canonical `s3://bucket/key` form of a URL returned by `upload_with_dedup`.
    fn url_to_canonical_path(&self, url: &str) -> Result<String, UploadError> {
        url_to_canonical_path(url)
    }
}

/// Where and how artifacts are stored.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub bucket: String,
    pub prefix: Option<String>,
    pub kms_key_id: Option<String>,
    pub force_upload: bool,
    pub region: String,
}

impl UploadSettings {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            kms_key_id: None,
            force_upload: false,
            region: DEFAULT_REGION.to_string(),
        }
    }
}

/// A local file resolved to its storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    pub local_path: PathBuf,
    pub checksum: String,
    pub key: String,
    pub url: String,
}

/// Hex MD5 of a byte slice.
pub fn content_checksum(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

/// Hex MD5 of a file's content, read in chunks.
pub async fn checksum_of(path: &Path) -> Result<String, UploadError> {
    let read_err = |source| UploadError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::open(path).await.map_err(read_err)?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).await.map_err(read_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// `{prefix}/{checksum}.{extension}`, or without the prefix when unset.
pub fn object_key(prefix: Option<&str>, checksum: &str, extension: &str) -> String {
    let name = if extension.is_empty() {
        checksum.to_string()
    } else {
        format!("{checksum}.{extension}")
    };
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}/{name}"),
        None => name,
    }
}

/// Uploader backed by a storage provider.
pub struct Uploader<S> {
    storage: Arc<S>,
    settings: UploadSettings,
    encryption: Encryption,
}

impl<S: StorageOps> Uploader<S> {
    pub fn new(storage: Arc<S>, settings: UploadSettings) -> Self {
        let encryption = Encryption::from_key_id(settings.kms_key_id.as_deref());
        Self {
            storage,
            settings,
            encryption,
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Resolve a local file to its key and URL without touching storage.
    pub async fn reference_for(
        &self,
        path: &Path,
        extension: &str,
    ) -> Result<ArtifactReference, UploadError> {
        let checksum = checksum_of(path).await?;
        let key = object_key(self.settings.prefix.as_deref(), &checksum, extension);
        let url = build_url(&self.settings.bucket, &self.settings.region, &key);
        Ok(ArtifactReference {
            local_path: path.to_path_buf(),
            checksum,
            key,
            url,
        })
    }

    /// Whether the object is already stored.
    pub async fn exists(&self, key: &str) -> Result<bool, UploadError> {
        self.storage
            .object_exists(&self.settings.bucket, key)
            .await
            .map_err(|source| UploadError::Exists {
                key: key.to_string(),
                source,
            })
    }

    /// Upload unless an object with the same content is already stored.
    pub async fn upload_artifact(
        &self,
        path: &Path,
        extension: &str,
    ) -> Result<ArtifactReference, UploadError> {
        let reference = self.reference_for(path, extension).await?;

        if !self.settings.force_upload && self.exists(&reference.key).await? {
            debug!(key = %reference.key, "Object already stored, skipping upload");
            return Ok(reference);
        }

        info!(
            path = %path.display(),
            bucket = %self.settings.bucket,
            key = %reference.key,
            "Uploading artifact"
        );
        self.storage
            .put_object(PutObjectRequest {
                bucket: &self.settings.bucket,
                key: &reference.key,
                source: path,
                encryption: &self.encryption,
            })
            .await
            .map_err(|source| UploadError::Put {
                path: path.to_path_buf(),
                key: reference.key.clone(),
                source,
            })?;

        Ok(reference)
    }
}

#[async_trait]
impl<S: StorageOps> Upload for Uploader<S> {
    async fn upload_with_dedup(&self, path: &Path, extension: &str) -> Result<String, UploadError> {
        self.upload_artifact(path, extension).await.map(|r| r.url)
    }
}
