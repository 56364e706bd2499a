// ABOUTME: Everything one deploy needs, fixed before the first provider call.
// ABOUTME: Also merges requested parameters with the deployed stack's parameters.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::provider::{Capability, Parameter, StackSnapshot, Tag};
use crate::types::StackName;
use crate::upload::Upload;

/// A deploy of one template to one stack.
///
/// Built once and then only borrowed; the orchestrator never mutates it.
#[derive(Clone)]
pub struct DeploymentRequest {
    pub stack_name: StackName,
    pub template_file: PathBuf,
    pub parameters: Vec<Parameter>,
    pub capabilities: Vec<Capability>,
    pub tags: Vec<Tag>,
    pub role_arn: Option<String>,
    pub notification_arns: Vec<String>,
    /// Delete and recreate a stack whose first creation failed.
    pub force_deploy: bool,
    pub fail_on_empty_changeset: bool,
    pub no_execute_changeset: bool,
    /// Upload the template and pass it by URL instead of inline.
    pub uploader: Option<Arc<dyn Upload>>,
}

impl DeploymentRequest {
    pub fn new(stack_name: StackName, template_file: impl Into<PathBuf>) -> Self {
        Self {
            stack_name,
            template_file: template_file.into(),
            parameters: Vec::new(),
            capabilities: Vec::new(),
            tags: Vec::new(),
            role_arn: None,
            notification_arns: Vec::new(),
            force_deploy: false,
            fail_on_empty_changeset: false,
            no_execute_changeset: false,
            uploader: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_role_arn(mut self, role_arn: Option<String>) -> Self {
        self.role_arn = role_arn;
        self
    }

    pub fn with_notification_arns(mut self, arns: Vec<String>) -> Self {
        self.notification_arns = arns;
        self
    }

    pub fn force_deploy(mut self, force: bool) -> Self {
        self.force_deploy = force;
        self
    }

    pub fn fail_on_empty_changeset(mut self, fail: bool) -> Self {
        self.fail_on_empty_changeset = fail;
        self
    }

    pub fn no_execute_changeset(mut self, no_execute: bool) -> Self {
        self.no_execute_changeset = no_execute;
        self
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn Upload>) -> Self {
        self.uploader = Some(uploader);
        self
    }
}

impl fmt::Debug for DeploymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentRequest")
            .field("stack_name", &self.stack_name)
            .field("template_file", &self.template_file)
            .field("parameters", &self.parameters)
            .field("capabilities", &self.capabilities)
            .field("tags", &self.tags)
            .field("role_arn", &self.role_arn)
            .field("notification_arns", &self.notification_arns)
            .field("force_deploy", &self.force_deploy)
            .field("fail_on_empty_changeset", &self.fail_on_empty_changeset)
            .field("no_execute_changeset", &self.no_execute_changeset)
            .field("uploader", &self.uploader.is_some())
            .finish()
    }
}

/// Whether the target stack exists, for change set purposes.
#[derive(Debug, Clone)]
pub enum StackPresence {
    /// No stack, or one that only holds an unexecuted change set.
    Absent,
    /// A stack that can be updated.
    Present(StackSnapshot),
    /// A stack whose first creation failed; it must be deleted first.
    Blocked(StackSnapshot),
}

/// Requested parameters, followed by every deployed parameter the request
/// does not mention, marked to keep its previous value.
pub fn merge_parameters(requested: &[Parameter], deployed: &[Parameter]) -> Vec<Parameter> {
    let specified: HashSet<&str> = requested.iter().map(|p| p.key.as_str()).collect();
    let mut merged = requested.to_vec();
    merged.extend(
        deployed
            .iter()
            .filter(|p| !specified.contains(p.key.as_str()))
            .map(|p| Parameter::use_previous(p.key.clone())),
    );
    merged
}
