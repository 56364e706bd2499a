// ABOUTME: Artifact storage configuration.
// ABOUTME: Bucket, key prefix, encryption key and forced re-upload.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub kms_key_id: Option<String>,

    #[serde(default)]
    pub force_upload: bool,
}
