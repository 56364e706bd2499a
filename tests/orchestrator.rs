// ABOUTME: Tests for the change set lifecycle against a scripted stack provider.
// ABOUTME: Covers type inference, blocked stacks, empty change sets and failed executions.

mod support;

use std::path::PathBuf;
use std::sync::Arc;

use stratus::deploy::{
    ChangeSetType, DeployErrorKind, DeployOutcome, DeploymentRequest, Orchestrator, run_deploy,
};
use stratus::provider::sentinel::NO_CHANGES_REASON;
use stratus::provider::{
    Encryption, Parameter, StackEvent, StackStatus, StatusReason, TemplateSource,
};
use stratus::stream::EventStreamer;
use stratus::types::StackName;
use stratus::upload::{UploadSettings, Uploader};
use support::{FakeStackProvider, FakeStorage, StackScript, event, snapshot};
use tempfile::TempDir;

const TEMPLATE: &str = "Resources:\n  Queue:\n    Type: AWS::SQS::Queue\n";

fn template_dir() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.yaml");
    std::fs::write(&path, TEMPLATE).unwrap();
    (dir, path)
}

fn request(template: &PathBuf) -> DeploymentRequest {
    DeploymentRequest::new(StackName::new("orders").unwrap(), template)
}

fn orchestrator(script: StackScript) -> (Arc<FakeStackProvider>, Orchestrator<FakeStackProvider>) {
    support::init_tracing();
    let provider = Arc::new(FakeStackProvider::new(script));
    let orchestrator = Orchestrator::new(Arc::clone(&provider)).with_changeset_prefix("test");
    (provider, orchestrator)
}

async fn deploy(
    orchestrator: &Orchestrator<FakeStackProvider>,
    request: &DeploymentRequest,
) -> Result<DeployOutcome, stratus::deploy::DeployError> {
    let mut sink: Vec<StackEvent> = Vec::new();
    run_deploy(orchestrator, None, &mut sink, request).await
}

mod change_set_type {
    use super::*;

    #[tokio::test]
    async fn missing_stack_gets_a_create_change_set() {
        let (_dir, template) = template_dir();
        let (provider, orchestrator) = orchestrator(StackScript::default());

        let outcome = deploy(&orchestrator, &request(&template)).await.unwrap();

        let submitted = provider.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].change_set_type, ChangeSetType::Create);
        assert!(submitted[0].change_set_name.starts_with("test-"));
        assert!(matches!(
            &submitted[0].template,
            TemplateSource::Body(body) if body == TEMPLATE
        ));
        assert!(provider.calls().contains(&"wait_until_stack_created"));

        let DeployOutcome::Deployed(stack) = outcome else {
            panic!("expected a deployed stack");
        };
        assert_eq!(stack.status, StackStatus::CreateComplete);
    }

    #[tokio::test]
    async fn stack_under_review_counts_as_missing() {
        let (_dir, template) = template_dir();
        let (provider, orchestrator) = orchestrator(StackScript {
            stack: Some(snapshot("orders", StackStatus::ReviewInProgress)),
            ..Default::default()
        });

        let record = orchestrator.create_change_set(&request(&template)).await.unwrap();
        assert_eq!(record.change_set_type(), ChangeSetType::Create);
        assert_eq!(provider.submitted()[0].change_set_type, ChangeSetType::Create);
    }

    #[tokio::test]
    async fn existing_stack_gets_an_update_that_keeps_unmentioned_parameters() {
        let (_dir, template) = template_dir();
        let mut existing = snapshot("orders", StackStatus::UpdateComplete);
        existing.parameters = vec![Parameter::new("Env", "dev"), Parameter::new("Size", "small")];
        let (provider, orchestrator) = orchestrator(StackScript {
            stack: Some(existing),
            status_after_execute: StackStatus::UpdateComplete,
            ..Default::default()
        });

        let request =
            request(&template).with_parameters(vec![Parameter::new("Env", "prod")]);
        deploy(&orchestrator, &request).await.unwrap();

        let submitted = provider.submitted();
        assert_eq!(submitted[0].change_set_type, ChangeSetType::Update);
        assert_eq!(
            submitted[0].parameters,
            vec![Parameter::new("Env", "prod"), Parameter::use_previous("Size")]
        );
        assert!(provider.calls().contains(&"wait_until_stack_updated"));
    }
}

mod blocked_stacks {
    use super::*;

    #[tokio::test]
    async fn failed_creation_is_refused_without_force() {
        let (_dir, template) = template_dir();
        let (provider, orchestrator) = orchestrator(StackScript {
            stack: Some(snapshot("orders", StackStatus::RollbackComplete)),
            ..Default::default()
        });

        let err = orchestrator
            .create_change_set(&request(&template))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::StackBlocked);
        assert!(err.to_string().contains("ROLLBACK_COMPLETE"));
        assert!(provider.submitted().is_empty());
        assert!(!provider.calls().contains(&"delete_stack"));
    }

    #[tokio::test]
    async fn forced_deploy_deletes_then_creates() {
        let (_dir, template) = template_dir();
        let (provider, orchestrator) = orchestrator(StackScript {
            stack: Some(snapshot("orders", StackStatus::CreateFailed)),
            ..Default::default()
        });

        let record = orchestrator
            .create_change_set(&request(&template).force_deploy(true))
            .await
            .unwrap();

        assert_eq!(record.change_set_type(), ChangeSetType::Create);
        assert_eq!(
            provider.calls(),
            vec![
                "describe_stack",
                "delete_stack",
                "wait_until_stack_deleted",
                "create_change_set"
            ]
        );
    }
}

mod empty_change_sets {
    use super::*;

    fn no_changes() -> StackScript {
        StackScript {
            stack: Some(snapshot("orders", StackStatus::UpdateComplete)),
            change_set_failure: Some(StatusReason::NoChanges(NO_CHANGES_REASON.to_string())),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn tolerated_by_default() {
        let (_dir, template) = template_dir();
        let (provider, orchestrator) = orchestrator(no_changes());

        let outcome = deploy(&orchestrator, &request(&template)).await.unwrap();

        let DeployOutcome::Unchanged(stack) = outcome else {
            panic!("expected an unchanged stack");
        };
        assert_eq!(stack.status, StackStatus::UpdateComplete);
        assert!(!provider.calls().contains(&"execute_change_set"));
    }

    #[tokio::test]
    async fn fails_when_requested() {
        let (_dir, template) = template_dir();
        let (_provider, orchestrator) = orchestrator(no_changes());

        let err = deploy(&orchestrator, &request(&template).fail_on_empty_changeset(true))
            .await
            .unwrap_err();

        assert!(err.is_empty_changeset());
        assert!(err.to_string().contains(NO_CHANGES_REASON));
    }

    #[tokio::test]
    async fn other_failures_are_not_empty() {
        let (_dir, template) = template_dir();
        let (provider, orchestrator) = orchestrator(StackScript {
            change_set_failure: Some(StatusReason::Other(
                "Template format error: unresolved resource dependencies".to_string(),
            )),
            ..Default::default()
        });

        let err = deploy(&orchestrator, &request(&template)).await.unwrap_err();

        assert!(!err.is_empty_changeset());
        assert!(err.to_string().contains("unresolved resource dependencies"));
        // The description is fetched even though the wait failed.
        assert!(provider.calls().contains(&"describe_change_set"));
    }
}

#[tokio::test]
async fn no_execute_stops_after_the_change_set_is_ready() {
    let (_dir, template) = template_dir();
    let (provider, orchestrator) = orchestrator(StackScript::default());

    let outcome = deploy(&orchestrator, &request(&template).no_execute_changeset(true))
        .await
        .unwrap();

    assert!(matches!(outcome, DeployOutcome::ChangeSetCreated(_)));
    assert!(!provider.calls().contains(&"execute_change_set"));
}

#[tokio::test]
async fn failed_execution_reports_the_final_status() {
    let (_dir, template) = template_dir();
    let (_provider, orchestrator) = orchestrator(StackScript {
        stack: Some(snapshot("orders", StackStatus::UpdateComplete)),
        stack_wait_fails: true,
        status_after_execute: StackStatus::UpdateRollbackComplete,
        ..Default::default()
    });

    let err = deploy(&orchestrator, &request(&template)).await.unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::StackFailed);
    assert_eq!(
        err.to_string(),
        "failed updating stack orders, status: UPDATE_ROLLBACK_COMPLETE"
    );
}

#[tokio::test]
async fn template_is_uploaded_when_an_uploader_is_given() {
    let (_dir, template) = template_dir();
    let (provider, orchestrator) = orchestrator(StackScript::default());
    let storage = Arc::new(FakeStorage::default());
    let mut settings = UploadSettings::new("artifacts");
    settings.region = "eu-west-1".to_string();
    let uploader = Arc::new(Uploader::new(Arc::clone(&storage), settings));

    deploy(&orchestrator, &request(&template).with_uploader(uploader))
        .await
        .unwrap();

    let puts = storage.puts();
    assert_eq!(puts.len(), 1);
    assert!(puts[0].key.ends_with(".template"));
    assert_eq!(puts[0].encryption, Encryption::Aes256);

    let submitted = provider.submitted();
    let TemplateSource::Url(url) = &submitted[0].template else {
        panic!("expected the template by URL");
    };
    assert_eq!(
        url,
        &format!("https://artifacts.s3.eu-west-1.amazonaws.com/{}", puts[0].key)
    );
}

#[tokio::test]
async fn streamed_deploy_only_reports_new_events() {
    let (_dir, template) = template_dir();
    let (_provider, orchestrator) = orchestrator(StackScript {
        event_histories: [
            vec![event("old")],
            vec![event("new-2"), event("new-1"), event("old")],
        ]
        .into(),
        ..Default::default()
    });
    let streamer = EventStreamer::new(Arc::clone(orchestrator.provider()))
        .with_intervals(std::time::Duration::ZERO, std::time::Duration::from_millis(10));

    let mut sink: Vec<StackEvent> = Vec::new();
    let outcome = run_deploy(&orchestrator, Some(&streamer), &mut sink, &request(&template))
        .await
        .unwrap();

    assert!(matches!(outcome, DeployOutcome::Deployed(_)));
    let ids: Vec<&str> = sink.iter().map(|e| e.event_id.as_str()).collect();
    assert_eq!(ids, ["new-2", "new-1"]);
}

mod provider_failures {
    use super::*;

    #[tokio::test]
    async fn describe_errors_other_than_missing_are_returned() {
        let (_dir, template) = template_dir();
        let (provider, orchestrator) = orchestrator(StackScript {
            stack: Some(snapshot("orders", StackStatus::UpdateComplete)),
            failing: vec!["describe_stack"],
            ..Default::default()
        });

        let err = orchestrator
            .determine_presence(&StackName::new("orders").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::Provider);
        assert!(err.to_string().contains("Rate exceeded"));

        let err = deploy(&orchestrator, &request(&template)).await.unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::Provider);
        assert!(provider.submitted().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_stops_a_forced_deploy() {
        let (_dir, template) = template_dir();
        let (provider, orchestrator) = orchestrator(StackScript {
            stack: Some(snapshot("orders", StackStatus::RollbackComplete)),
            failing: vec!["delete_stack"],
            ..Default::default()
        });

        let err = orchestrator
            .create_change_set(&request(&template).force_deploy(true))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Deletion);
        assert!(provider.submitted().is_empty());
        assert!(!provider.calls().contains(&"wait_until_stack_deleted"));
    }

    #[tokio::test]
    async fn failed_delete_wait_stops_a_forced_deploy() {
        let (_dir, template) = template_dir();
        let (provider, orchestrator) = orchestrator(StackScript {
            stack: Some(snapshot("orders", StackStatus::CreateFailed)),
            failing: vec!["wait_until_stack_deleted"],
            ..Default::default()
        });

        let err = orchestrator
            .create_change_set(&request(&template).force_deploy(true))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Deletion);
        assert!(provider.submitted().is_empty());
    }

    #[tokio::test]
    async fn rejected_execution_is_reported() {
        let (_dir, template) = template_dir();
        let (provider, orchestrator) = orchestrator(StackScript {
            failing: vec!["execute_change_set"],
            ..Default::default()
        });

        let err = deploy(&orchestrator, &request(&template)).await.unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Execution);
        assert!(err.to_string().contains("Rate exceeded"));
        assert!(!provider.calls().contains(&"wait_until_stack_created"));
    }

    #[tokio::test]
    async fn event_listing_failure_is_reported_after_the_wait() {
        let (_dir, template) = template_dir();
        let (provider, orchestrator) = orchestrator(StackScript::default());
        let streamer = EventStreamer::new(Arc::clone(orchestrator.provider()))
            .with_intervals(std::time::Duration::ZERO, std::time::Duration::from_millis(10));

        let submitted = orchestrator.create_change_set(&request(&template)).await.unwrap();
        let ready = orchestrator.wait_for_change_set(submitted).await.unwrap();
        let executing = orchestrator.execute_change_set(ready).await.unwrap();
        provider.script().failing.push("describe_stack_events");

        let mut sink: Vec<StackEvent> = Vec::new();
        let err = orchestrator
            .wait_for_execute(executing, Some((&streamer, &mut sink)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Streaming);
        assert!(sink.is_empty());
        assert!(provider.calls().contains(&"wait_until_stack_created"));
    }
}
