// ABOUTME: Test support utilities.
// ABOUTME: Scripted in-memory stack and storage providers for integration tests.

// Each test binary only uses some of these helpers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, Once};

use async_trait::async_trait;
use stratus::provider::{
    ChangeSetDescription, ChangeSetInput, ChangeSetStatus, Encryption, PutObjectRequest,
    StackError, StackEvent, StackEventPage, StackOps, StackSnapshot, StackStatus, StatusReason,
    StorageError, StorageOps,
};
use stratus::types::{ChangeSetId, StackId, StackName};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("stratus=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn snapshot(name: &str, status: StackStatus) -> StackSnapshot {
    StackSnapshot {
        stack_id: StackId::new(format!("arn:aws:cloudformation:eu-west-1:123:stack/{name}/1")),
        stack_name: name.to_string(),
        status,
        status_reason: None,
        parameters: Vec::new(),
        tags: Vec::new(),
        outputs: Vec::new(),
    }
}

pub fn event(id: &str) -> StackEvent {
    let mut event = StackEvent::new(id);
    event.logical_resource_id = Some(format!("Resource-{id}"));
    event.resource_status = Some("CREATE_IN_PROGRESS".to_string());
    event
}

/// What the fake stack provider does, and what it was asked to do.
#[derive(Debug)]
pub struct StackScript {
    /// Returned by `describe_stack`; `None` reports the stack as missing.
    pub stack: Option<StackSnapshot>,
    /// Fail `wait_until_change_set_ready` with this status reason.
    pub change_set_failure: Option<StatusReason>,
    /// Fail the create/update waiter.
    pub stack_wait_fails: bool,
    /// Status the stack reaches once the change set executes.
    pub status_after_execute: StackStatus,
    /// Successive full event histories; the last one repeats.
    pub event_histories: VecDeque<Vec<StackEvent>>,
    /// Events per page; `None` returns each history in one page.
    pub page_size: Option<usize>,
    /// Calls that fail with an API error instead of doing their work.
    pub failing: Vec<&'static str>,

    pub calls: Vec<&'static str>,
    pub submitted: Vec<ChangeSetInput>,
    /// Full event listings started so far.
    pub listings: usize,
}

impl Default for StackScript {
    fn default() -> Self {
        Self {
            stack: None,
            change_set_failure: None,
            stack_wait_fails: false,
            status_after_execute: StackStatus::CreateComplete,
            event_histories: VecDeque::new(),
            page_size: None,
            failing: Vec::new(),
            calls: Vec::new(),
            submitted: Vec::new(),
            listings: 0,
        }
    }
}

impl StackScript {
    /// Record `call`, failing it when the script says so.
    fn record(&mut self, call: &'static str) -> Result<(), StackError> {
        self.calls.push(call);
        if self.failing.contains(&call) {
            return Err(StackError::api(call, "Rate exceeded"));
        }
        Ok(())
    }
}

/// A `StackOps` implementation driven by a `StackScript`.
#[derive(Debug, Default)]
pub struct FakeStackProvider {
    script: Mutex<StackScript>,
}

impl FakeStackProvider {
    pub fn new(script: StackScript) -> Self {
        Self {
            script: Mutex::new(script),
        }
    }

    pub fn script(&self) -> MutexGuard<'_, StackScript> {
        self.script.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.script().calls.clone()
    }

    pub fn submitted(&self) -> Vec<ChangeSetInput> {
        self.script().submitted.clone()
    }
}

#[async_trait]
impl StackOps for FakeStackProvider {
    async fn describe_stack(&self, name: &StackName) -> Result<Option<StackSnapshot>, StackError> {
        let mut script = self.script();
        script.record("describe_stack")?;
        match &script.stack {
            Some(stack) => Ok(Some(stack.clone())),
            None => Err(StackError::NotFound(name.to_string())),
        }
    }

    async fn create_change_set(&self, input: &ChangeSetInput) -> Result<ChangeSetId, StackError> {
        let mut script = self.script();
        script.calls.push("create_change_set");
        script.submitted.push(input.clone());
        if script.stack.is_none() {
            // Creating a change set for a new stack leaves it under review.
            script.stack = Some(snapshot(input.stack_name.as_str(), StackStatus::ReviewInProgress));
        }
        Ok(ChangeSetId::new(format!(
            "arn:aws:cloudformation:eu-west-1:123:changeSet/{}/1",
            input.change_set_name
        )))
    }

    async fn describe_change_set(
        &self,
        stack: &StackName,
        change_set: &ChangeSetId,
    ) -> Result<ChangeSetDescription, StackError> {
        let mut script = self.script();
        script.calls.push("describe_change_set");
        let (status, status_reason) = match &script.change_set_failure {
            Some(reason) => (ChangeSetStatus::Failed, Some(reason.clone())),
            None => (ChangeSetStatus::CreateComplete, None),
        };
        Ok(ChangeSetDescription {
            change_set_id: change_set.clone(),
            change_set_name: "fake".to_string(),
            stack_name: stack.to_string(),
            status,
            status_reason,
            execution_status: Some("AVAILABLE".to_string()),
            changes: Vec::new(),
        })
    }

    async fn wait_until_change_set_ready(
        &self,
        _stack: &StackName,
        _change_set: &ChangeSetId,
    ) -> Result<(), StackError> {
        let mut script = self.script();
        script.calls.push("wait_until_change_set_ready");
        match &script.change_set_failure {
            Some(reason) => Err(StackError::waiter("change set create complete", reason.message())),
            None => Ok(()),
        }
    }

    async fn execute_change_set(
        &self,
        stack: &StackName,
        _change_set: &ChangeSetId,
    ) -> Result<(), StackError> {
        let mut script = self.script();
        script.record("execute_change_set")?;
        let status = script.status_after_execute.clone();
        script.stack = Some(snapshot(stack.as_str(), status));
        Ok(())
    }

    async fn delete_stack(&self, _name: &StackName) -> Result<(), StackError> {
        let mut script = self.script();
        script.record("delete_stack")?;
        script.stack = None;
        Ok(())
    }

    async fn wait_until_stack_deleted(&self, _name: &StackName) -> Result<(), StackError> {
        self.script().record("wait_until_stack_deleted")
    }

    async fn wait_until_stack_created(&self, _name: &StackName) -> Result<(), StackError> {
        self.wait_for_stack("wait_until_stack_created")
    }

    async fn wait_until_stack_updated(&self, _name: &StackName) -> Result<(), StackError> {
        self.wait_for_stack("wait_until_stack_updated")
    }

    async fn describe_stack_events(
        &self,
        _name: &StackName,
        next_token: Option<&str>,
    ) -> Result<StackEventPage, StackError> {
        let mut script = self.script();
        script.record("describe_stack_events")?;

        // Every listing after the first moves on to the next scripted history.
        if next_token.is_none() {
            if script.listings > 0 && script.event_histories.len() > 1 {
                script.event_histories.pop_front();
            }
            script.listings += 1;
        }
        let history = script.event_histories.front().cloned().unwrap_or_default();

        let start = next_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = match script.page_size {
            Some(size) => (start + size).min(history.len()),
            None => history.len(),
        };
        Ok(StackEventPage {
            events: history[start..end].to_vec(),
            next_token: (end < history.len()).then(|| end.to_string()),
        })
    }
}

impl FakeStackProvider {
    fn wait_for_stack(&self, call: &'static str) -> Result<(), StackError> {
        let mut script = self.script();
        script.calls.push(call);
        if script.stack_wait_fails {
            Err(StackError::waiter("stack operation", "waiter entered a failure state"))
        } else {
            Ok(())
        }
    }
}

/// One recorded `put_object` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub source: PathBuf,
    pub content: Vec<u8>,
    pub encryption: Encryption,
}

/// In-memory object storage that records every upload.
#[derive(Debug, Default)]
pub struct FakeStorage {
    objects: Mutex<Vec<StoredObject>>,
    failing: Mutex<Vec<&'static str>>,
}

impl FakeStorage {
    pub fn puts(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }

    /// Make every later `operation` ("HeadObject" or "PutObject") fail.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().push(operation);
    }

    fn check(&self, operation: &'static str, bucket: &str, key: &str) -> Result<(), StorageError> {
        if self.failing.lock().unwrap().contains(&operation) {
            return Err(StorageError::Api {
                operation,
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "Access Denied".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StorageOps for FakeStorage {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        self.check("HeadObject", bucket, key)?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .any(|o| o.bucket == bucket && o.key == key))
    }

    async fn put_object(&self, request: PutObjectRequest<'_>) -> Result<(), StorageError> {
        self.check("PutObject", request.bucket, request.key)?;
        let content = std::fs::read(request.source)?;
        self.objects.lock().unwrap().push(StoredObject {
            bucket: request.bucket.to_string(),
            key: request.key.to_string(),
            source: request.source.to_path_buf(),
            content,
            encryption: request.encryption.clone(),
        });
        Ok(())
    }
}
