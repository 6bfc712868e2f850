use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result, log_not_found};
use crate::notify::{Notifier, NotifyAction};
use crate::store::Store;
use crate::task::{Task, TaskDraft};
use crate::timer::TimerRegistry;

/// Cross-context message, e.g. a snooze request originating from a
/// notification action handler. May arrive arbitrarily after the
/// notification fired, including for tasks deleted in the interim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Snooze { id: Uuid, minutes: i64 },
}

/// Decision for a fired reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderAction {
    /// Finalize: remove the task from the store.
    Complete,
    /// Push the due time forward by this many minutes and re-arm.
    Snooze(i64),
    /// Leave the task pending with no armed timer; a snooze message may
    /// still arrive for it later.
    Keep,
}

/// Consulted once per dispatch, after the notification was emitted.
pub trait ReminderHandler {
    fn on_reminder(&mut self, task: &Task) -> ReminderAction;
}

impl<F> ReminderHandler for F
where
    F: FnMut(&Task) -> ReminderAction,
{
    fn on_reminder(&mut self, task: &Task) -> ReminderAction {
        self(task)
    }
}

/// Removes the task once its reminder fired, matching the default
/// behavior of the reminder list UI.
#[derive(Debug, Default)]
pub struct AutoComplete;

impl ReminderHandler for AutoComplete {
    fn on_reminder(&mut self, _task: &Task) -> ReminderAction {
        ReminderAction::Complete
    }
}

/// Background-context policy: no interactive choice is available, so the
/// task stays in the store and the notification's snooze affordance is the
/// only way to act on it.
#[derive(Debug, Default)]
pub struct KeepPending;

impl ReminderHandler for KeepPending {
    fn on_reminder(&mut self, _task: &Task) -> ReminderAction {
        ReminderAction::Keep
    }
}

/// Reminder scheduling and state-reconciliation engine.
///
/// The in-memory map is the single source of truth for the session; the
/// timer registry is kept consistent with it through every mutation path.
/// Timer expiries and cross-context messages feed one serialized queue,
/// drained by `pump`.
pub struct Engine {
    tasks: BTreeMap<Uuid, Task>,
    timers: TimerRegistry,
    store: Box<dyn Store>,
    notifier: Box<dyn Notifier>,
    handler: Box<dyn ReminderHandler>,
    inbox: VecDeque<Message>,
}

impl Engine {
    pub fn new(
        store: Box<dyn Store>,
        notifier: Box<dyn Notifier>,
        handler: Box<dyn ReminderHandler>,
    ) -> Self {
        Self {
            tasks: BTreeMap::new(),
            timers: TimerRegistry::new(),
            store,
            notifier,
            handler,
            inbox: VecDeque::new(),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Current task set, ordered by due time.
    pub fn tasks(&self) -> Vec<&Task> {
        let mut rows: Vec<&Task> = self.tasks.values().collect();
        rows.sort_by_key(|task| (task.due_at, task.id));
        rows
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Summary counts over the current task set.
    pub fn stats(&self, now: DateTime<Utc>) -> crate::stats::Stats {
        crate::stats::compute(&self.tasks(), now)
    }

    /// Validates before any state change: empty text and non-future due
    /// times are rejected with no in-memory mutation, no armed timer and
    /// no persistence write.
    #[instrument(skip(self, draft, now), fields(text = %draft.text))]
    pub fn add(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<Task> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(Error::validation("task text must not be empty"));
        }
        if draft.due_at <= now {
            return Err(Error::validation("due time must be in the future"));
        }

        let task = Task::new(text.to_string(), draft.category, draft.due_at, now);
        info!(id = %task.id, due_at = %task.due_at, "adding task");

        self.tasks.insert(task.id, task.clone());
        self.timers.arm(task.id, task.due_at);
        self.store
            .write_one(&task)
            .map_err(Error::persistence)?;

        Ok(task)
    }

    /// Text-only edit; the due time and the armed timer are untouched.
    #[instrument(skip(self, new_text, now))]
    pub fn edit(&mut self, id: Uuid, new_text: &str, now: DateTime<Utc>) -> Result<bool> {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            return Err(Error::validation("task text must not be empty"));
        }

        let Some(task) = self.tasks.get_mut(&id) else {
            log_not_found("edit", id);
            return Ok(false);
        };

        task.text = new_text.to_string();
        task.modified = now;
        let snapshot = task.clone();
        self.store
            .write_one(&snapshot)
            .map_err(Error::persistence)?;

        Ok(true)
    }

    /// Completing cancels the timer even if the due time has not elapsed.
    /// Reopening re-arms only for a still-future due time; a past due time
    /// is never retroactively armed.
    #[instrument(skip(self, now))]
    pub fn toggle_done(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let Some(task) = self.tasks.get_mut(&id) else {
            log_not_found("toggle_done", id);
            return Ok(false);
        };

        task.done = !task.done;
        task.modified = now;
        let snapshot = task.clone();

        if snapshot.done {
            self.timers.cancel(id);
        } else if snapshot.due_at > now {
            self.timers.arm(id, snapshot.due_at);
        }

        info!(id = %id, done = snapshot.done, "toggled task");
        self.store
            .write_one(&snapshot)
            .map_err(Error::persistence)?;

        Ok(true)
    }

    /// Cancel-before-remove: the timer goes first so a fire can never race
    /// a task that is no longer in the store.
    #[instrument(skip(self))]
    pub fn remove(&mut self, id: Uuid) -> Result<bool> {
        if !self.tasks.contains_key(&id) {
            log_not_found("remove", id);
            return Ok(false);
        }

        self.timers.cancel(id);
        self.tasks.remove(&id);
        info!(id = %id, "removed task");
        self.store.delete_one(id).map_err(Error::persistence)?;

        Ok(true)
    }

    /// Single convergence point for both snooze triggers (in-app choice and
    /// cross-context message): `new_due = max(now, due) + delta`. The timer
    /// is re-armed before the durable write, so a failed write still leaves
    /// it tracking the in-memory due time. Unknown or completed ids are a
    /// silent no-op since the task may have been deleted or finished
    /// concurrently.
    #[instrument(skip(self, now))]
    pub fn snooze(&mut self, id: Uuid, delta_minutes: i64, now: DateTime<Utc>) -> Result<bool> {
        if delta_minutes <= 0 {
            return Err(Error::validation("snooze delta must be positive"));
        }

        let Some(task) = self.tasks.get_mut(&id) else {
            log_not_found("snooze", id);
            return Ok(false);
        };
        if task.done {
            debug!(id = %id, "snooze on completed task ignored");
            return Ok(false);
        }

        let base = task.due_at.max(now);
        task.due_at = base + Duration::minutes(delta_minutes);
        task.modified = now;
        let snapshot = task.clone();

        info!(id = %id, delta_minutes, due_at = %snapshot.due_at, "snoozed task");

        self.timers.arm(id, snapshot.due_at);
        self.store
            .write_one(&snapshot)
            .map_err(Error::persistence)?;

        Ok(true)
    }

    /// Reconciliation: replaces the in-memory set wholesale from the
    /// persistence collaborator and re-arms a timer for every non-done
    /// task. Tasks already past due fire their reminder as part of this
    /// call (zero-delay policy), not silently skipped. Returns the task
    /// set as it stands once those immediate dispatches settled.
    #[instrument(skip(self, now))]
    pub fn load(&mut self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let records = self.store.read_all().map_err(Error::persistence)?;
        info!(count = records.len(), "reconciling from persistence");

        self.timers.cancel_all();
        self.tasks.clear();

        for record in records {
            if !record.done {
                self.timers.arm(record.id, record.due_at);
            }
            self.tasks.insert(record.id, record);
        }

        self.pump(now)?;

        Ok(self.tasks().into_iter().cloned().collect())
    }

    /// Enqueues an external message; processed on the next `pump`.
    pub fn post(&mut self, message: Message) {
        debug!(?message, "posted message");
        self.inbox.push_back(message);
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.timers.next_due()
    }

    /// Drains the serialized event queue: elapsed timers first, then
    /// posted messages, repeating until neither source has anything due.
    /// Returns the ids that were dispatched.
    #[instrument(skip(self, now))]
    pub fn pump(&mut self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let mut fired = Vec::new();

        loop {
            let due = self.timers.take_due(now);
            let messages: Vec<Message> = self.inbox.drain(..).collect();
            if due.is_empty() && messages.is_empty() {
                break;
            }

            for id in due {
                self.dispatch(id, now)?;
                fired.push(id);
            }

            for message in messages {
                match message {
                    Message::Snooze { id, minutes } => {
                        // Same coordinator as the in-app path; a stale id
                        // degrades to a no-op inside snooze().
                        if let Err(err) = self.snooze(id, minutes, now) {
                            if err.is_validation() {
                                warn!(id = %id, error = %err, "dropping invalid snooze message");
                            } else {
                                return Err(err);
                            }
                        }
                    }
                }
            }
        }

        Ok(fired)
    }

    /// Invoked when a task's time elapses. Re-fetches the task by id at
    /// the point of acting rather than closing over the record that was
    /// current when the timer was armed.
    fn dispatch(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let Some(task) = self.tasks.get(&id).cloned() else {
            log_not_found("dispatch", id);
            return Ok(());
        };
        if task.done {
            debug!(id = %id, "skipping dispatch for completed task");
            return Ok(());
        }

        info!(id = %id, text = %task.text, "reminder due");

        if self.notifier.available() {
            self.notifier.show(
                "Task reminder",
                &task.text,
                id,
                &[NotifyAction::Snooze, NotifyAction::Dismiss],
            );
        } else {
            debug!(id = %id, "notifier unavailable; skipping emission");
        }

        match self.handler.on_reminder(&task) {
            ReminderAction::Complete => {
                self.remove(id)?;
            }
            ReminderAction::Snooze(minutes) => {
                self.snooze(id, minutes, now)?;
            }
            ReminderAction::Keep => {
                debug!(id = %id, "task kept pending with no armed timer");
            }
        }

        Ok(())
    }
}
