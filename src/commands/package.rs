// ABOUTME: Package command implementation.
// ABOUTME: Uploads local function code and writes or prints the rewritten template.

use std::sync::Arc;

use super::artifacts::upload_settings;
use crate::cli::PackageArgs;
use stratus::config::Config;
use stratus::error::{Error, Result};
use stratus::output::Output;
use stratus::package::{PackageRequest, Packager, run_package};
use stratus::provider::AwsProvider;
use stratus::upload::Uploader;

/// Package a template's local artifacts.
pub async fn package(
    config: Config,
    args: PackageArgs,
    region: Option<String>,
    mut output: Output,
) -> Result<()> {
    if args.artifacts.s3_bucket.is_none() && config.artifacts.bucket.is_none() {
        return Err(Error::InvalidArgument(
            "--s3-bucket is required (or set artifacts.bucket in the config file)".to_string(),
        ));
    }

    output.start_timer();
    let region = region.or_else(|| config.region.clone());
    let provider = Arc::new(AwsProvider::connect(region.as_deref()).await);
    let settings = upload_settings(&args.artifacts, &config.artifacts, provider.region())
        .ok_or_else(|| Error::InvalidArgument("--s3-bucket is required".to_string()))?;

    let packager = Packager::new(Arc::new(Uploader::new(provider, settings)));
    let request = PackageRequest {
        template_file: args.template_file,
        output_template_file: args.output_template_file,
    };

    output.progress(&format!("Packaging {}", request.template_file.display()));
    let packaged = run_package(&packager, &request).await?;

    match &packaged.written_to {
        Some(path) => output.success(&format!(
            "Successfully packaged artifacts and wrote output template to {}",
            path.display()
        )),
        None => output.raw(&packaged.template)?,
    }
    Ok(())
}
