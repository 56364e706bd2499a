// ABOUTME: Template packaging: upload local function code and rewrite references.
// ABOUTME: Export, marshall and write, in that order; artifacts upload one at a time.

pub mod archive;
mod error;
mod tags;
mod template;

pub use error::{PackageError, PackageStage};
pub use template::{
    FunctionResource, LAMBDA_FUNCTION, Resource, SERVERLESS_FUNCTION, Template, TemplateFormat,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use snafu::{ResultExt, ensure};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::upload::Upload;
use error::{
    ArchiveSnafu, InspectArtifactSnafu, InvalidResourceSnafu, MissingArtifactSnafu, ShortWriteSnafu,
    UploadSnafu, WriteOutputSnafu,
};

/// What to package and where to put the result.
#[derive(Debug, Clone)]
pub struct PackageRequest {
    pub template_file: PathBuf,
    /// Written here when set, otherwise returned to the caller.
    pub output_template_file: Option<PathBuf>,
}

/// Result of a packaging run.
#[derive(Debug, Clone)]
pub struct PackageOutput {
    pub template: Vec<u8>,
    pub written_to: Option<PathBuf>,
}

/// Where a function's code currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CodeLocation<'a> {
    Absent,
    /// Already in storage, or addressed by URL.
    Remote,
    /// An intrinsic function or inline/structured code; left alone.
    Unmanaged,
    Local(&'a str),
}

fn locate(value: Option<&Value>) -> CodeLocation<'_> {
    match value {
        None | Some(Value::Null) => CodeLocation::Absent,
        Some(Value::String(s)) if s.is_empty() => CodeLocation::Absent,
        Some(Value::String(s)) if is_remote(s) => CodeLocation::Remote,
        Some(Value::String(s)) => CodeLocation::Local(s),
        Some(_) => CodeLocation::Unmanaged,
    }
}

fn is_remote(location: &str) -> bool {
    ["s3://", "http://", "https://"]
        .iter()
        .any(|scheme| location.starts_with(scheme))
}

/// Split `s3://bucket/key` into bucket and key.
fn split_canonical(path: &str) -> Option<(&str, &str)> {
    path.strip_prefix("s3://")?.split_once('/')
}

/// Uploads local function code and rewrites the template to reference it.
pub struct Packager {
    uploader: Arc<dyn Upload>,
}

impl Packager {
    pub fn new(uploader: Arc<dyn Upload>) -> Self {
        Self { uploader }
    }

    /// Open the template and replace every local code reference with the
    /// storage location of its uploaded archive.
    pub async fn export(&self, template_file: &Path) -> Result<Template, PackageError> {
        let mut template = Template::open(template_file).await?;
        let base_dir = template_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let ids: Vec<String> = template.resources().keys().cloned().collect();
        for id in ids {
            let Some(resource) = template.resource(&id) else {
                continue;
            };
            let updated = self.export_resource(&id, resource, &base_dir).await?;
            if let Some(updated) = updated {
                template.replace_resource(&id, updated);
            }
        }

        Ok(template)
    }

    /// Upload one resource's code. `None` when nothing needed uploading.
    async fn export_resource(
        &self,
        id: &str,
        resource: &Resource,
        base_dir: &Path,
    ) -> Result<Option<Resource>, PackageError> {
        let (Some(property), Some(function)) = (resource.code_property(), resource.as_function())
        else {
            return Ok(None);
        };

        let local = match locate(function.property(property)) {
            CodeLocation::Local(local) => local,
            location => {
                debug!(resource = id, ?location, "Nothing to upload");
                return Ok(None);
            }
        };

        let path = base_dir.join(local);
        let canonical = self.upload_local_code(id, &path).await?;

        let rewritten = match resource {
            Resource::LambdaFunction(_) => {
                let (bucket, key) = split_canonical(&canonical).ok_or_else(|| {
                    InvalidResourceSnafu {
                        resource: id,
                        reason: format!("unexpected storage path {canonical}"),
                    }
                    .build()
                })?;
                let mut code = Map::new();
                code.insert("S3Bucket".to_string(), Value::String(bucket.to_string()));
                code.insert("S3Key".to_string(), Value::String(key.to_string()));
                Value::Object(code)
            }
            _ => Value::String(canonical.clone()),
        };

        let mut updated = resource.clone();
        if let Some(function) = updated.as_function_mut() {
            function.set_property(property, rewritten);
        }
        info!(resource = id, location = %canonical, "Packaged function code");
        Ok(Some(updated))
    }

    /// Archive (unless already a zip) and upload; returns `s3://bucket/key`.
    async fn upload_local_code(&self, id: &str, path: &Path) -> Result<String, PackageError> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return MissingArtifactSnafu { resource: id, path }.fail();
            }
            Err(e) => {
                return Err(e).context(InspectArtifactSnafu { resource: id, path });
            }
        };

        let already_zipped = metadata.is_file()
            && archive::is_zip(path).context(InspectArtifactSnafu { resource: id, path })?;

        let url = if already_zipped {
            debug!(resource = id, path = %path.display(), "Uploading existing archive");
            self.uploader
                .upload_with_dedup(path, "zip")
                .await
                .context(UploadSnafu { resource: id })?
        } else {
            let source = path.to_path_buf();
            let temp = tokio::task::spawn_blocking(move || archive::zip_to_temp(&source))
                .await
                .map_err(|e| archive::ArchiveError::Temp(std::io::Error::other(e)))
                .and_then(|result| result)
                .context(ArchiveSnafu { resource: id, path })?;
            debug!(resource = id, archive = %temp.path().display(), "Archived local code");
            // The temporary archive is removed when `temp` drops.
            self.uploader
                .upload_with_dedup(temp.path(), "zip")
                .await
                .context(UploadSnafu { resource: id })?
        };

        self.uploader
            .url_to_canonical_path(&url)
            .context(UploadSnafu { resource: id })
    }
}

/// Write `bytes` to `path`, failing on a short write.
pub async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), PackageError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .context(WriteOutputSnafu { path })?;
    let written = file.write(bytes).await.context(WriteOutputSnafu { path })?;
    ensure!(
        written == bytes.len(),
        ShortWriteSnafu {
            path,
            written,
            expected: bytes.len(),
        }
    );
    file.flush().await.context(WriteOutputSnafu { path })?;
    Ok(())
}

/// Export, marshall, then write the result or hand it back.
///
/// The output format follows the output file's extension when one is given,
/// otherwise the input template's.
pub async fn run_package(
    packager: &Packager,
    request: &PackageRequest,
) -> Result<PackageOutput, PackageError> {
    let template = packager.export(&request.template_file).await?;
    let format_path = request
        .output_template_file
        .as_deref()
        .unwrap_or(&request.template_file);
    let bytes = template.marshall(format_path)?;

    if let Some(output) = &request.output_template_file {
        write_output(output, &bytes).await?;
        info!(path = %output.display(), "Wrote packaged template");
    }

    Ok(PackageOutput {
        template: bytes,
        written_to: request.output_template_file.clone(),
    })
}
