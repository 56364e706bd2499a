// ABOUTME: Resolves upload settings from command-line flags and configuration.
// ABOUTME: Flags take precedence; a bucket from either source enables uploads.

use crate::cli::ArtifactArgs;
use stratus::config::ArtifactsConfig;
use stratus::upload::UploadSettings;

/// Upload settings, or `None` when no bucket is configured anywhere.
pub fn upload_settings(
    args: &ArtifactArgs,
    config: &ArtifactsConfig,
    region: &str,
) -> Option<UploadSettings> {
    let bucket = args.s3_bucket.as_ref().or(config.bucket.as_ref())?;
    let mut settings = UploadSettings::new(bucket.clone());
    settings.prefix = args.s3_prefix.clone().or_else(|| config.prefix.clone());
    settings.kms_key_id = args
        .kms_key_id
        .clone()
        .or_else(|| config.kms_key_id.clone());
    settings.force_upload = args.force_upload || config.force_upload;
    settings.region = region.to_string();
    Some(settings)
}
