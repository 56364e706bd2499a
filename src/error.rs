// ABOUTME: Application-wide error types for stratus.
// ABOUTME: Configuration errors live here; module errors are wrapped via From.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployError;
use crate::package::PackageError;
use crate::types::StackNameError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid stack name: {0}")]
    InvalidStackName(#[from] StackNameError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
