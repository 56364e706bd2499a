// ABOUTME: Polls a stack's event history and emits events not seen before.
// ABOUTME: Runs until signalled that the stack operation finished, then drains once more.

mod error;
mod seen;

pub use error::StreamError;
pub use seen::{EventSink, SeenEvents};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use crate::provider::{StackEvent, StackOps};
use crate::types::StackName;

/// Delay before the first poll.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Delay between subsequent polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Streams stack events to a sink while a stack operation runs.
pub struct EventStreamer<P> {
    provider: Arc<P>,
    initial_delay: Duration,
    poll_interval: Duration,
}

impl<P: StackOps> EventStreamer<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            initial_delay: DEFAULT_INITIAL_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_intervals(mut self, initial_delay: Duration, poll_interval: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.poll_interval = poll_interval;
        self
    }

    /// Fetch the full event history and return the events whose id is not in
    /// `seen`, in the order the provider returned them.
    pub async fn describe_new_events(
        &self,
        stack: &StackName,
        seen: &SeenEvents,
    ) -> Result<Vec<StackEvent>, StreamError> {
        let mut fresh = Vec::new();
        let mut fresh_ids = HashSet::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .provider
                .describe_stack_events(stack, next_token.as_deref())
                .await
                .map_err(|source| StreamError::DescribeEvents {
                    stack: stack.to_string(),
                    source,
                })?;

            for event in page.events {
                if seen.contains(&event.event_id) || !fresh_ids.insert(event.event_id.clone()) {
                    continue;
                }
                fresh.push(event);
            }

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(fresh)
    }

    /// Poll until `done` fires, writing each new event to `sink`.
    ///
    /// After `done` resolves (or its sender is dropped) exactly one more poll
    /// runs so events recorded just before the operation finished are not
    /// lost. Returns the final seen-set.
    pub async fn start_streaming(
        &self,
        stack: &StackName,
        initial: SeenEvents,
        sink: &mut dyn EventSink,
        mut done: oneshot::Receiver<()>,
    ) -> Result<SeenEvents, StreamError> {
        let mut seen = initial;
        let mut delay = self.initial_delay;

        loop {
            tokio::select! {
                biased;
                _ = &mut done => {
                    debug!(stack = %stack, "Operation finished, draining events");
                    self.poll_once(stack, &mut seen, sink).await?;
                    return Ok(seen);
                }
                _ = tokio::time::sleep(delay) => {
                    self.poll_once(stack, &mut seen, sink).await?;
                    delay = self.poll_interval;
                }
            }
        }
    }

    async fn poll_once(
        &self,
        stack: &StackName,
        seen: &mut SeenEvents,
        sink: &mut dyn EventSink,
    ) -> Result<(), StreamError> {
        let fresh = self.describe_new_events(stack, seen).await?;
        debug!(stack = %stack, new_events = fresh.len(), "Polled stack events");
        for event in &fresh {
            sink.write_event(event);
        }
        seen.extend(fresh);
        Ok(())
    }
}
