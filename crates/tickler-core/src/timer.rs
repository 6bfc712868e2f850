use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

/// Owns at most one pending deadline per task id.
///
/// The id→deadline mapping is private; other components go through
/// `arm`/`cancel` and never reach into it. Deadlines at or before the
/// current time are kept, not dropped: `take_due` returns them on the next
/// drain, which is how past-due tasks fire immediately after a reload.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    armed: BTreeMap<Uuid, DateTime<Utc>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a deadline for `id`, replacing any existing one.
    /// Replace semantics, never stacked: after this call exactly one
    /// pending deadline exists for `id`.
    pub fn arm(&mut self, id: Uuid, due_at: DateTime<Utc>) {
        let replaced = self.armed.insert(id, due_at);
        debug!(id = %id, due_at = %due_at, replaced = replaced.is_some(), "armed timer");
    }

    /// Idempotent; canceling an id with no armed deadline is a no-op.
    /// Cancellation is synchronous: a canceled deadline can never be
    /// returned by `take_due` afterward.
    pub fn cancel(&mut self, id: Uuid) {
        if self.armed.remove(&id).is_some() {
            debug!(id = %id, "canceled timer");
        }
    }

    /// Used on full reset / wholesale reload.
    pub fn cancel_all(&mut self) {
        let count = self.armed.len();
        self.armed.clear();
        debug!(count, "canceled all timers");
    }

    pub fn is_armed(&self, id: Uuid) -> bool {
        self.armed.contains_key(&id)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    /// Earliest pending deadline, if any. Drives the wall-clock sleep in
    /// the watch loop.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.armed.values().min().copied()
    }

    /// Removes and returns every id whose deadline has elapsed, ordered by
    /// deadline (ties broken by id for determinism).
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<Uuid> {
        let mut due: Vec<(DateTime<Utc>, Uuid)> = self
            .armed
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, at)| (*at, *id))
            .collect();
        due.sort();

        for (_, id) in &due {
            self.armed.remove(id);
        }

        due.into_iter().map(|(_, id)| id).collect()
    }
}
