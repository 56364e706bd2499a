// ABOUTME: AWS-backed provider: CloudFormation for stacks, S3 for artifacts.
// ABOUTME: Translates SDK shapes into provider records and classifies sentinel errors.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudformation::client::Waiters;
use aws_sdk_cloudformation::config::Region;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_cloudformation::types as cfn;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::error::{StackError, StorageError};
use super::sentinel;
use super::shared_types::{
    ChangeSetDescription, ChangeSetInput, ChangeSetStatus, ChangeSetType, Encryption, Parameter,
    PutObjectRequest, ResourceChange, StackEvent, StackEventPage, StackOutput, StackSnapshot,
    StackStatus, StatusReason, Tag, TemplateSource,
};
use super::stack_ops::StackOps;
use super::storage_ops::StorageOps;
use crate::types::{ChangeSetId, EventId, StackId, StackName};

/// Region used for URL construction when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Upper bound for any single provider waiter.
const WAITER_MAX: Duration = Duration::from_secs(60 * 60);

/// One SDK configuration shared by the CloudFormation and S3 clients.
#[derive(Clone, Debug)]
pub struct AwsProvider {
    cloudformation: aws_sdk_cloudformation::Client,
    s3: aws_sdk_s3::Client,
    region: String,
}

impl AwsProvider {
    /// Load credentials and region from the standard AWS chain.
    /// An explicit region overrides the chain's region.
    pub async fn connect(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = loader.load().await;

        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        debug!(region = %region, "Loaded AWS configuration");

        Self {
            cloudformation: aws_sdk_cloudformation::Client::new(&config),
            s3: aws_sdk_s3::Client::new(&config),
            region,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

// SDK getters for modelled-required members return plain references while
// optional ones return `Option`. This folds both into `Option`.
trait Opt<'a, T: ?Sized> {
    fn opt(self) -> Option<&'a T>;
}

impl<'a, T: ?Sized> Opt<'a, T> for &'a T {
    fn opt(self) -> Option<&'a T> {
        Some(self)
    }
}

impl<'a, T: ?Sized> Opt<'a, T> for Option<&'a T> {
    fn opt(self) -> Option<&'a T> {
        self
    }
}

fn owned<'a>(value: impl Opt<'a, str>) -> Option<String> {
    value.opt().map(str::to_string)
}

fn describe<E: std::error::Error>(err: &E) -> String {
    DisplayErrorContext(err).to_string()
}

fn to_chrono(timestamp: &aws_sdk_cloudformation::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

fn snapshot_from(stack: &cfn::Stack) -> StackSnapshot {
    let parameters = stack
        .parameters()
        .opt()
        .unwrap_or_default()
        .iter()
        .filter_map(|p| {
            let key = owned(p.parameter_key())?;
            Some(Parameter {
                key,
                value: owned(p.parameter_value()),
                use_previous_value: false,
            })
        })
        .collect();

    let tags = stack
        .tags()
        .opt()
        .unwrap_or_default()
        .iter()
        .filter_map(|t| Some(Tag::new(owned(t.key())?, owned(t.value()).unwrap_or_default())))
        .collect();

    let outputs = stack
        .outputs()
        .opt()
        .unwrap_or_default()
        .iter()
        .filter_map(|o| {
            Some(StackOutput {
                key: owned(o.output_key())?,
                value: owned(o.output_value()).unwrap_or_default(),
                description: owned(o.description()),
            })
        })
        .collect();

    StackSnapshot {
        stack_id: StackId::new(owned(stack.stack_id()).unwrap_or_default()),
        stack_name: owned(stack.stack_name()).unwrap_or_default(),
        status: stack
            .stack_status()
            .opt()
            .map(|s| StackStatus::from(s.as_str()))
            .unwrap_or_else(|| StackStatus::Unknown(String::new())),
        status_reason: owned(stack.stack_status_reason()),
        parameters,
        tags,
        outputs,
    }
}

fn event_from(event: &cfn::StackEvent) -> StackEvent {
    StackEvent {
        event_id: EventId::new(owned(event.event_id()).unwrap_or_default()),
        logical_resource_id: owned(event.logical_resource_id()),
        resource_type: owned(event.resource_type()),
        resource_status: event
            .resource_status()
            .opt()
            .map(|s| s.as_str().to_string()),
        status_reason: owned(event.resource_status_reason()),
        timestamp: event.timestamp().opt().and_then(to_chrono),
    }
}

fn change_from(change: &cfn::Change) -> Option<ResourceChange> {
    let rc = change.resource_change()?;
    Some(ResourceChange {
        action: rc
            .action()
            .opt()
            .map(|a| a.as_str().to_string())
            .unwrap_or_default(),
        logical_resource_id: owned(rc.logical_resource_id()).unwrap_or_default(),
        resource_type: owned(rc.resource_type()).unwrap_or_default(),
        replacement: rc.replacement().opt().map(|r| r.as_str().to_string()),
    })
}

fn sdk_parameter(parameter: &Parameter) -> cfn::Parameter {
    cfn::Parameter::builder()
        .parameter_key(&parameter.key)
        .set_parameter_value(parameter.value.clone())
        .set_use_previous_value(parameter.use_previous_value.then_some(true))
        .build()
}

fn sdk_tag(tag: &Tag) -> cfn::Tag {
    cfn::Tag::builder().key(&tag.key).value(&tag.value).build()
}

#[async_trait]
impl StackOps for AwsProvider {
    async fn describe_stack(&self, name: &StackName) -> Result<Option<StackSnapshot>, StackError> {
        let result = self
            .cloudformation
            .describe_stacks()
            .stack_name(name.as_str())
            .send()
            .await;

        match result {
            Ok(output) => Ok(output
                .stacks()
                .opt()
                .unwrap_or_default()
                .first()
                .map(snapshot_from)),
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .and_then(|e| e.message())
                    .is_some_and(|m| sentinel::is_stack_missing(m, name.as_str()));
                if missing {
                    Err(StackError::NotFound(name.to_string()))
                } else {
                    Err(StackError::api("DescribeStacks", describe(&err)))
                }
            }
        }
    }

    async fn create_change_set(&self, input: &ChangeSetInput) -> Result<ChangeSetId, StackError> {
        let change_set_type = match input.change_set_type {
            ChangeSetType::Create => cfn::ChangeSetType::Create,
            ChangeSetType::Update => cfn::ChangeSetType::Update,
        };

        let mut request = self
            .cloudformation
            .create_change_set()
            .stack_name(input.stack_name.as_str())
            .change_set_name(&input.change_set_name)
            .change_set_type(change_set_type)
            .description(&input.description)
            .set_parameters(Some(input.parameters.iter().map(sdk_parameter).collect()))
            .set_capabilities(Some(
                input
                    .capabilities
                    .iter()
                    .map(|c| cfn::Capability::from(c.as_str()))
                    .collect(),
            ))
            .set_tags(Some(input.tags.iter().map(sdk_tag).collect()))
            .set_role_arn(input.role_arn.clone())
            .set_notification_arns(Some(input.notification_arns.clone()));

        request = match &input.template {
            TemplateSource::Body(body) => request.template_body(body),
            TemplateSource::Url(url) => request.template_url(url),
        };

        let output = request
            .send()
            .await
            .map_err(|e| StackError::api("CreateChangeSet", describe(&e)))?;

        owned(output.id())
            .map(ChangeSetId::new)
            .ok_or_else(|| StackError::api("CreateChangeSet", "response did not include an id"))
    }

    async fn describe_change_set(
        &self,
        stack: &StackName,
        change_set: &ChangeSetId,
    ) -> Result<ChangeSetDescription, StackError> {
        let output = self
            .cloudformation
            .describe_change_set()
            .stack_name(stack.as_str())
            .change_set_name(change_set.as_str())
            .send()
            .await
            .map_err(|e| StackError::api("DescribeChangeSet", describe(&e)))?;

        Ok(ChangeSetDescription {
            change_set_id: ChangeSetId::new(
                owned(output.change_set_id()).unwrap_or_else(|| change_set.to_string()),
            ),
            change_set_name: owned(output.change_set_name()).unwrap_or_default(),
            stack_name: owned(output.stack_name()).unwrap_or_else(|| stack.to_string()),
            status: output
                .status()
                .opt()
                .map(|s| ChangeSetStatus::from(s.as_str()))
                .unwrap_or_else(|| ChangeSetStatus::Unknown(String::new())),
            status_reason: owned(output.status_reason()).map(StatusReason::classify),
            execution_status: output
                .execution_status()
                .opt()
                .map(|s| s.as_str().to_string()),
            changes: output
                .changes()
                .opt()
                .unwrap_or_default()
                .iter()
                .filter_map(change_from)
                .collect(),
        })
    }

    async fn wait_until_change_set_ready(
        &self,
        stack: &StackName,
        change_set: &ChangeSetId,
    ) -> Result<(), StackError> {
        self.cloudformation
            .wait_until_change_set_create_complete()
            .stack_name(stack.as_str())
            .change_set_name(change_set.as_str())
            .wait(WAITER_MAX)
            .await
            .map(|_| ())
            .map_err(|e| StackError::waiter("change set creation", describe(&e)))
    }

    async fn execute_change_set(
        &self,
        stack: &StackName,
        change_set: &ChangeSetId,
    ) -> Result<(), StackError> {
        self.cloudformation
            .execute_change_set()
            .stack_name(stack.as_str())
            .change_set_name(change_set.as_str())
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StackError::api("ExecuteChangeSet", describe(&e)))
    }

    async fn delete_stack(&self, name: &StackName) -> Result<(), StackError> {
        self.cloudformation
            .delete_stack()
            .stack_name(name.as_str())
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StackError::api("DeleteStack", describe(&e)))
    }

    async fn wait_until_stack_deleted(&self, name: &StackName) -> Result<(), StackError> {
        self.cloudformation
            .wait_until_stack_delete_complete()
            .stack_name(name.as_str())
            .wait(WAITER_MAX)
            .await
            .map(|_| ())
            .map_err(|e| StackError::waiter("stack deletion", describe(&e)))
    }

    async fn wait_until_stack_created(&self, name: &StackName) -> Result<(), StackError> {
        self.cloudformation
            .wait_until_stack_create_complete()
            .stack_name(name.as_str())
            .wait(WAITER_MAX)
            .await
            .map(|_| ())
            .map_err(|e| StackError::waiter("stack creation", describe(&e)))
    }

    async fn wait_until_stack_updated(&self, name: &StackName) -> Result<(), StackError> {
        self.cloudformation
            .wait_until_stack_update_complete()
            .stack_name(name.as_str())
            .wait(WAITER_MAX)
            .await
            .map(|_| ())
            .map_err(|e| StackError::waiter("stack update", describe(&e)))
    }

    async fn describe_stack_events(
        &self,
        name: &StackName,
        next_token: Option<&str>,
    ) -> Result<StackEventPage, StackError> {
        let output = self
            .cloudformation
            .describe_stack_events()
            .stack_name(name.as_str())
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| StackError::api("DescribeStackEvents", describe(&e)))?;

        Ok(StackEventPage {
            events: output
                .stack_events()
                .opt()
                .unwrap_or_default()
                .iter()
                .map(event_from)
                .collect(),
            next_token: owned(output.next_token()),
        })
    }
}

#[async_trait]
impl StorageOps for AwsProvider {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        match self.s3.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(StorageError::Api {
                operation: "HeadObject",
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: describe(&err),
            }),
        }
    }

    async fn put_object(&self, request: PutObjectRequest<'_>) -> Result<(), StorageError> {
        let body = ByteStream::from_path(request.source)
            .await
            .map_err(|e| StorageError::Api {
                operation: "PutObject",
                bucket: request.bucket.to_string(),
                key: request.key.to_string(),
                message: describe(&e),
            })?;

        let mut put = self
            .s3
            .put_object()
            .bucket(request.bucket)
            .key(request.key)
            .body(body);

        put = match request.encryption {
            Encryption::Aes256 => put.server_side_encryption(ServerSideEncryption::Aes256),
            Encryption::Kms { key_id } => put
                .server_side_encryption(ServerSideEncryption::AwsKms)
                .ssekms_key_id(key_id),
        };

        put.send().await.map(|_| ()).map_err(|e| StorageError::Api {
            operation: "PutObject",
            bucket: request.bucket.to_string(),
            key: request.key.to_string(),
            message: describe(&e),
        })
    }
}
