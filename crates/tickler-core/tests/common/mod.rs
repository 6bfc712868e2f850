#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tickler_core::engine::{Engine, ReminderHandler};
use tickler_core::notify::{Notifier, NotifyAction};
use tickler_core::store::{MemoryStore, Store};
use tickler_core::task::{Category, Task, TaskDraft};
use uuid::Uuid;

/// Notifier that records what would have been shown.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    pub shown: Arc<Mutex<Vec<(Uuid, String)>>>,
    pub unavailable: bool,
}

impl Notifier for RecordingNotifier {
    fn available(&self) -> bool {
        !self.unavailable
    }

    fn show(&self, _title: &str, body: &str, correlation_id: Uuid, _actions: &[NotifyAction]) {
        self.shown
            .lock()
            .expect("notifier lock")
            .push((correlation_id, body.to_string()));
    }
}

impl RecordingNotifier {
    pub fn shown_ids(&self) -> Vec<Uuid> {
        self.shown
            .lock()
            .expect("notifier lock")
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Store handle that stays inspectable after the engine takes ownership.
pub struct SharedStore(pub Arc<MemoryStore>);

impl Store for SharedStore {
    fn read_all(&self) -> anyhow::Result<Vec<Task>> {
        self.0.read_all()
    }

    fn write_one(&self, task: &Task) -> anyhow::Result<Uuid> {
        self.0.write_one(task)
    }

    fn delete_one(&self, id: Uuid) -> anyhow::Result<()> {
        self.0.delete_one(id)
    }
}

/// Store whose writes can be made to fail mid-session.
pub struct FailingStore {
    pub inner: Arc<MemoryStore>,
    pub fail_writes: Arc<AtomicBool>,
}

impl Store for FailingStore {
    fn read_all(&self) -> anyhow::Result<Vec<Task>> {
        self.inner.read_all()
    }

    fn write_one(&self, task: &Task) -> anyhow::Result<Uuid> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.write_one(task)
    }

    fn delete_one(&self, id: Uuid) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.delete_one(id)
    }
}

pub fn engine_with_failing_store(
    handler: Box<dyn ReminderHandler>,
) -> (Engine, Arc<MemoryStore>, Arc<AtomicBool>, RecordingNotifier) {
    let inner = Arc::new(MemoryStore::new());
    let fail_writes = Arc::new(AtomicBool::new(false));
    let notifier = RecordingNotifier::default();
    let engine = Engine::new(
        Box::new(FailingStore {
            inner: inner.clone(),
            fail_writes: fail_writes.clone(),
        }),
        Box::new(notifier.clone()),
        handler,
    );
    (engine, inner, fail_writes, notifier)
}

pub fn engine_with(
    store: Arc<MemoryStore>,
    handler: Box<dyn ReminderHandler>,
) -> (Engine, RecordingNotifier) {
    let notifier = RecordingNotifier::default();
    let engine = Engine::new(
        Box::new(SharedStore(store)),
        Box::new(notifier.clone()),
        handler,
    );
    (engine, notifier)
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0)
        .single()
        .expect("valid t0")
}

pub fn draft(text: &str, due_at: DateTime<Utc>) -> TaskDraft {
    TaskDraft {
        text: text.to_string(),
        category: Category::Work,
        due_at,
    }
}
