//! Per-operation counters fed from the event stream.

use citadel_types::{EventKind, ProtocolEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct Counts {
    committed: AtomicU64,
    rejected: AtomicU64,
}

/// Thread-safe committed/rejected counters keyed by operation name.
///
/// Subscribe [`EventStats::observe`] to an `EventBus` to keep it current.
pub struct EventStats {
    counters: HashMap<&'static str, Counts>,
}

impl EventStats {
    pub fn new(kinds: &[EventKind]) -> Self {
        let counters = kinds
            .iter()
            .map(|k| (k.name(), Counts::default()))
            .collect();
        Self { counters }
    }

    pub fn observe(&self, event: &ProtocolEvent) {
        if let Some(counts) = self.counters.get(event.kind.name()) {
            let counter = if event.outcome.is_committed() {
                &counts.committed
            } else {
                &counts.rejected
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn committed(&self, kind: EventKind) -> u64 {
        self.counters
            .get(kind.name())
            .map(|c| c.committed.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn rejected(&self, kind: EventKind) -> u64 {
        self.counters
            .get(kind.name())
            .map(|c| c.rejected.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// `(committed, rejected)` per operation name.
    pub fn snapshot(&self) -> HashMap<&'static str, (u64, u64)> {
        self.counters
            .iter()
            .map(|(&k, v)| {
                (
                    k,
                    (
                        v.committed.load(Ordering::Relaxed),
                        v.rejected.load(Ordering::Relaxed),
                    ),
                )
            })
            .collect()
    }
}
