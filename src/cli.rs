// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the deploy and package subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use stratus::output::OutputMode;
use stratus::provider::Capability;

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Change-set based CloudFormation deploys and artifact packaging")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a configuration file (default: discover stratus.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output mode
    #[arg(long, global = true, value_enum, default_value_t = OutputMode::Normal)]
    pub output: OutputMode,

    /// AWS region (overrides config and environment)
    #[arg(long, global = true)]
    pub region: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy a template through a change set
    Deploy(DeployArgs),

    /// Upload local function code and write a template that references it
    Package(PackageArgs),
}

/// Where and how artifacts are uploaded.
#[derive(Args, Debug, Clone, Default)]
pub struct ArtifactArgs {
    /// Bucket for uploaded artifacts
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Key prefix for uploaded artifacts
    #[arg(long)]
    pub s3_prefix: Option<String>,

    /// KMS key used to encrypt uploaded artifacts
    #[arg(long)]
    pub kms_key_id: Option<String>,

    /// Upload even if an identical object already exists
    #[arg(long)]
    pub force_upload: bool,
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Template to deploy
    #[arg(long)]
    pub template_file: PathBuf,

    /// Stack name
    #[arg(long)]
    pub name: String,

    #[command(flatten)]
    pub artifacts: ArtifactArgs,

    /// Parameters as Key=Value pairs, inline JSON, or a JSON file
    #[arg(long, num_args = 1..)]
    pub parameter_overrides: Vec<String>,

    /// Capabilities to acknowledge
    #[arg(long, num_args = 1.., value_parser = parse_capability)]
    pub capabilities: Vec<Capability>,

    /// Create the change set but do not execute it
    #[arg(long)]
    pub no_execute_changeset: bool,

    /// Role the provider assumes for the deploy
    #[arg(long)]
    pub role_arn: Option<String>,

    /// Notification topics for stack events
    #[arg(long, num_args = 1..)]
    pub notification_arns: Vec<String>,

    /// Fail when the change set contains no changes
    #[arg(long)]
    pub fail_on_empty_changeset: bool,

    /// Stack tags as Key=Value
    #[arg(long, num_args = 1..)]
    pub tags: Vec<String>,

    /// Delete and recreate a stack whose creation failed
    #[arg(long)]
    pub force_deploy: bool,

    /// Stream stack events while the change set executes
    #[arg(long)]
    pub stream: bool,

    /// Environment overrides (defined in config)
    #[arg(short, long)]
    pub environment: Option<String>,
}

#[derive(Args, Debug)]
pub struct PackageArgs {
    /// Template to package
    #[arg(long)]
    pub template_file: PathBuf,

    /// Where to write the packaged template (default: stdout)
    #[arg(long)]
    pub output_template_file: Option<PathBuf>,

    #[command(flatten)]
    pub artifacts: ArtifactArgs,

    /// Environment overrides (defined in config)
    #[arg(short, long)]
    pub environment: Option<String>,
}

fn parse_capability(value: &str) -> Result<Capability, String> {
    value.parse()
}
