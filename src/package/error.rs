// ABOUTME: Packaging error types with SNAFU context selectors.
// ABOUTME: Each variant belongs to a stage so callers can tell where packaging failed.

use std::path::PathBuf;

use snafu::Snafu;

use super::archive::ArchiveError;
use crate::upload::UploadError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PackageError {
    #[snafu(display("failed to read template {}: {source}", path.display()))]
    ReadTemplate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse YAML template {}: {source}", path.display()))]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("failed to parse JSON template {}: {source}", path.display()))]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("template {} is not a mapping", path.display()))]
    NotAMapping { path: PathBuf },

    #[snafu(display("resource {resource}: {reason}"))]
    InvalidResource { resource: String, reason: String },

    #[snafu(display("resource {resource}: artifact {} does not exist", path.display()))]
    MissingArtifact { resource: String, path: PathBuf },

    #[snafu(display("resource {resource}: failed to inspect {}: {source}", path.display()))]
    InspectArtifact {
        resource: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("resource {resource}: failed to archive {}: {source}", path.display()))]
    Archive {
        resource: String,
        path: PathBuf,
        source: ArchiveError,
    },

    #[snafu(display("resource {resource}: upload failed: {source}"))]
    Upload {
        resource: String,
        source: UploadError,
    },

    #[snafu(display("failed to serialize template as JSON: {source}"))]
    MarshallJson { source: serde_json::Error },

    #[snafu(display("failed to serialize template as YAML: {source}"))]
    MarshallYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("short write to {}: wrote {written} of {expected} bytes", path.display()))]
    ShortWrite {
        path: PathBuf,
        written: usize,
        expected: usize,
    },
}

/// Packaging stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStage {
    /// Reading or parsing the template.
    Open,
    /// Locating local artifacts referenced by resources.
    Search,
    /// Zipping local code.
    Archive,
    /// Uploading archives to storage.
    Upload,
    /// Serializing the rewritten template.
    Marshall,
    /// Writing the output file.
    Write,
}

impl PackageError {
    pub fn stage(&self) -> PackageStage {
        match self {
            PackageError::ReadTemplate { .. }
            | PackageError::ParseYaml { .. }
            | PackageError::ParseJson { .. }
            | PackageError::NotAMapping { .. } => PackageStage::Open,
            PackageError::InvalidResource { .. }
            | PackageError::MissingArtifact { .. }
            | PackageError::InspectArtifact { .. } => PackageStage::Search,
            PackageError::Archive { .. } => PackageStage::Archive,
            PackageError::Upload { .. } => PackageStage::Upload,
            PackageError::MarshallJson { .. } | PackageError::MarshallYaml { .. } => {
                PackageStage::Marshall
            }
            PackageError::WriteOutput { .. } | PackageError::ShortWrite { .. } => {
                PackageStage::Write
            }
        }
    }
}
