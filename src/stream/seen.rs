// ABOUTME: The set of events already emitted during one streaming session.
// ABOUTME: Grows monotonically; an id is never removed once recorded.

use std::collections::HashMap;

use crate::provider::StackEvent;
use crate::types::EventId;

/// Events keyed by id. Owned by a single streaming session.
#[derive(Debug, Clone, Default)]
pub struct SeenEvents {
    events: HashMap<EventId, StackEvent>,
}

impl SeenEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.events.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Record an event. An id already present keeps its first recording.
    pub fn insert(&mut self, event: StackEvent) {
        self.events.entry(event.event_id.clone()).or_insert(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = StackEvent>) {
        for event in events {
            self.insert(event);
        }
    }
}

impl FromIterator<StackEvent> for SeenEvents {
    fn from_iter<I: IntoIterator<Item = StackEvent>>(iter: I) -> Self {
        let mut seen = SeenEvents::new();
        seen.extend(iter);
        seen
    }
}

/// Receives newly discovered events, in discovery order.
pub trait EventSink: Send {
    fn write_event(&mut self, event: &StackEvent);
}

/// Collects events in memory.
impl EventSink for Vec<StackEvent> {
    fn write_event(&mut self, event: &StackEvent) {
        self.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_recording_wins() {
        let mut seen = SeenEvents::new();
        let mut first = StackEvent::new("e1");
        first.resource_status = Some("CREATE_IN_PROGRESS".to_string());
        seen.insert(first);
        seen.insert(StackEvent::new("e1"));

        assert_eq!(seen.len(), 1);
        assert!(seen.contains(&EventId::new("e1")));
    }

    #[test]
    fn collects_from_iterator() {
        let seen: SeenEvents = ["a", "b", "a"].into_iter().map(StackEvent::new).collect();
        assert_eq!(seen.len(), 2);
        assert!(!seen.is_empty());
    }
}
