//! Bounded detection history backing the dashboard.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::models::DetectionEvent;

/// Default number of retained detections.
pub const DEFAULT_CAPACITY: usize = 20;

/// Newest-first, capacity-bounded detection log.
///
/// Mutated only by the detection paths, read only by the dashboard. A single
/// mutex covers both operations; the event rate (malicious verdicts only) is
/// far too low for contention to matter.
pub struct HistoryLedger {
    events: Mutex<VecDeque<DetectionEvent>>,
    capacity: usize,
}

impl HistoryLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Insert at the head, evicting the oldest entry when at capacity.
    /// Eviction is a defined policy, not an error.
    pub fn record(&self, event: DetectionEvent) {
        let mut events = self.events.lock();
        events.push_front(event);
        while events.len() > self.capacity {
            events.pop_back();
        }
    }

    /// Copy of the current history, newest first.
    pub fn snapshot(&self) -> Vec<DetectionEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
