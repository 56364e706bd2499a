// ABOUTME: Deploy command implementation.
// ABOUTME: Builds the request from flags and config, then runs the change set flow.

use std::sync::Arc;

use super::artifacts::upload_settings;
use crate::cli::DeployArgs;
use stratus::config::Config;
use stratus::deploy::{DeployOutcome, DeploymentRequest, Orchestrator, run_deploy};
use stratus::error::Result;
use stratus::output::Output;
use stratus::params::{overlay_parameters, overlay_tags, parse_parameter_overrides, parse_tag};
use stratus::provider::AwsProvider;
use stratus::stream::EventStreamer;
use stratus::types::StackName;
use stratus::upload::Uploader;

/// Deploy a template to a stack through a change set.
pub async fn deploy(
    config: Config,
    args: DeployArgs,
    region: Option<String>,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let stack_name = StackName::new(&args.name)?;

    let parameters = overlay_parameters(
        config.resolved_parameters()?,
        parse_parameter_overrides(&args.parameter_overrides)?,
    );
    let cli_tags = args
        .tags
        .iter()
        .map(String::as_str)
        .map(parse_tag)
        .collect::<Result<Vec<_>>>()?;
    let tags = overlay_tags(config.resolved_tags(), cli_tags);

    let region = region.or_else(|| config.region.clone());
    let provider = Arc::new(AwsProvider::connect(region.as_deref()).await);

    let mut request = DeploymentRequest::new(stack_name, &args.template_file)
        .with_parameters(parameters)
        .with_capabilities(args.capabilities)
        .with_tags(tags)
        .with_role_arn(args.role_arn)
        .with_notification_arns(args.notification_arns)
        .force_deploy(args.force_deploy)
        .fail_on_empty_changeset(args.fail_on_empty_changeset)
        .no_execute_changeset(args.no_execute_changeset);

    if let Some(settings) = upload_settings(&args.artifacts, &config.artifacts, provider.region()) {
        request = request.with_uploader(Arc::new(Uploader::new(Arc::clone(&provider), settings)));
    }

    let orchestrator =
        Orchestrator::new(Arc::clone(&provider)).with_changeset_prefix(&config.changeset_prefix);
    let streamer = args.stream.then(|| {
        EventStreamer::new(Arc::clone(&provider))
            .with_intervals(config.streaming.initial_delay, config.streaming.poll_interval)
    });

    output.progress(&format!(
        "Deploying {} to stack {} in {}",
        args.template_file.display(),
        request.stack_name,
        provider.region()
    ));

    let mut printer = output.event_printer();
    let outcome = run_deploy(&orchestrator, streamer.as_ref(), &mut printer, &request).await?;

    match &outcome {
        DeployOutcome::Unchanged(stack) => {
            output.success(&format!(
                "No changes to deploy. Stack {} is up to date",
                stack.stack_name
            ));
        }
        DeployOutcome::ChangeSetCreated(change_set) => {
            output.success(&format!(
                "Change set {} created but not executed",
                change_set.change_set_id
            ));
        }
        DeployOutcome::Deployed(stack) => {
            output.success(&format!(
                "Successfully deployed stack {} ({})",
                stack.stack_name, stack.status
            ));
        }
    }
    output.result(&outcome)?;
    Ok(())
}
