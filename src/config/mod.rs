// ABOUTME: Configuration types and parsing for stratus.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and environment merging.

mod artifacts;
mod env_value;
mod streaming;

pub use artifacts::ArtifactsConfig;
pub use env_value::{EnvValue, resolve_env_map};
pub use streaming::StreamingConfig;

use crate::deploy::DEFAULT_CHANGESET_PREFIX;
use crate::error::{Error, Result};
use crate::provider::{Parameter, Tag};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const CONFIG_FILENAME: &str = "stratus.yml";
pub const CONFIG_FILENAME_ALT: &str = "stratus.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".stratus/config.yml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default = "default_changeset_prefix")]
    pub changeset_prefix: String,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub parameters: BTreeMap<String, EnvValue>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub environments: HashMap<String, Environment>,
}

/// Named overrides, e.g. `staging` or `production`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub artifacts: Option<ArtifactsConfig>,

    #[serde(default)]
    pub parameters: BTreeMap<String, EnvValue>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_changeset_prefix() -> String {
    DEFAULT_CHANGESET_PREFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            region: None,
            changeset_prefix: default_changeset_prefix(),
            artifacts: ArtifactsConfig::default(),
            streaming: StreamingConfig::default(),
            parameters: BTreeMap::new(),
            tags: BTreeMap::new(),
            environments: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml).map_err(Error::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Discovered config, or defaults when the directory has none.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.changeset_prefix.is_empty() {
            return Err(Error::InvalidConfig(
                "changeset_prefix cannot be empty".to_string(),
            ));
        }
        if self.streaming.poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "streaming.poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn for_environment(&self, name: &str) -> Result<Config> {
        let env = self
            .environments
            .get(name)
            .ok_or_else(|| Error::UnknownEnvironment(name.to_string()))?;

        let mut merged = self.clone();

        if env.region.is_some() {
            merged.region = env.region.clone();
        }

        // Replace artifacts if the environment specifies them
        if let Some(ref artifacts) = env.artifacts {
            merged.artifacts = artifacts.clone();
        }

        // Deep merge parameters
        for (k, v) in &env.parameters {
            merged.parameters.insert(k.clone(), v.clone());
        }

        // Deep merge tags
        for (k, v) in &env.tags {
            merged.tags.insert(k.clone(), v.clone());
        }

        Ok(merged)
    }

    /// Configured parameters with environment references resolved, in key order.
    pub fn resolved_parameters(&self) -> Result<Vec<Parameter>> {
        Ok(resolve_env_map(&self.parameters)?
            .into_iter()
            .map(|(key, value)| Parameter::new(key, value))
            .collect())
    }

    pub fn resolved_tags(&self) -> Vec<Tag> {
        self.tags
            .iter()
            .map(|(key, value)| Tag::new(key.clone(), value.clone()))
            .collect()
    }
}
