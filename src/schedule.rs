//! Cancellable one-shot task slot.
//!
//! Both cores defer some transitions (match resolution, error auto-clear)
//! behind a fixed delay. A `Delayed<T>` holds at most one pending task with
//! its due time; the host polls with the current time and the task fires at
//! most once. Because the slot lives inside the owning state struct, a reset
//! cancels it structurally and no stale mutation can land afterwards.

use chrono::{DateTime, Duration, Utc};

/// A single pending task with a due time.
#[derive(Debug, Clone, Default)]
pub struct Delayed<T> {
    slot: Option<(DateTime<Utc>, T)>,
}

impl<T> Delayed<T> {
    pub fn new() -> Self {
        Self { slot: None }
    }

    /// Arm the slot, replacing any pending task.
    pub fn arm(&mut self, now: DateTime<Utc>, delay: Duration, task: T) {
        self.slot = Some((now + delay, task));
    }

    /// Drop the pending task, if any.
    pub fn cancel(&mut self) {
        self.slot = None;
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.slot.as_ref().map(|(due, _)| *due)
    }

    /// Take the task if its due time has passed. Fires at most once.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Option<T> {
        match &self.slot {
            Some((due, _)) if now >= *due => self.slot.take().map(|(_, task)| task),
            _ => None,
        }
    }
}
