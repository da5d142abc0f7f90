//! Nullable event subscriber: captures the event stream for assertions.

use citadel_types::{EventBus, EventKind, ProtocolEvent};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every event emitted on the buses it is attached to.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<ProtocolEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recorder already subscribed to `bus`.
    pub fn attach(bus: &EventBus) -> Self {
        let recorder = Self::new();
        let sink = recorder.events.clone();
        bus.subscribe(move |e| sink.lock().push(e.clone()));
        recorder
    }

    pub fn events(&self) -> Vec<ProtocolEvent> {
        self.events.lock().clone()
    }

    pub fn last(&self) -> Option<ProtocolEvent> {
        self.events.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Events of one kind, in emission order.
    pub fn of_kind(&self, kind: EventKind) -> Vec<ProtocolEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}
