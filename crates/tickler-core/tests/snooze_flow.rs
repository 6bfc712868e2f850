mod common;

use std::sync::{Arc, Mutex};

use chrono::Duration;
use tickler_core::engine::{AutoComplete, Message, ReminderAction};
use tickler_core::store::{MemoryStore, Store};
use tickler_core::task::Task;

use common::{draft, engine_with, t0};

#[test]
fn sequential_snoozes_accumulate_with_one_timer() {
    let store = Arc::new(MemoryStore::new());
    let (mut engine, _notifier) = engine_with(store.clone(), Box::new(AutoComplete));

    let now = t0();
    let original_due = now + Duration::minutes(10);
    let task = engine.add(draft("Review PR", original_due), now).expect("add");

    // Each snooze happens before the due time, so the base stays the due
    // time and the deltas sum: 10 + 5 + 7 + 9 minutes.
    for delta in [5, 7, 9] {
        assert!(engine.snooze(task.id, delta, now).expect("snooze"));
        assert_eq!(engine.timers().armed_count(), 1);
        assert!(engine.timers().is_armed(task.id));
    }

    let snoozed = engine.get(task.id).expect("task present");
    assert_eq!(snoozed.due_at, original_due + Duration::minutes(21));

    let persisted = store.read_all().expect("read");
    assert_eq!(persisted[0].due_at, snoozed.due_at);
}

#[test]
fn snooze_after_due_time_is_relative_to_now() {
    let store = Arc::new(MemoryStore::new());
    let (mut engine, _notifier) = engine_with(store, Box::new(AutoComplete));

    let now = t0();
    let task = engine
        .add(draft("Stretch", now + Duration::minutes(1)), now)
        .expect("add");

    // Acting an hour late: the new due time is max(now, due) + delta.
    let late = now + Duration::minutes(61);
    assert!(engine.snooze(task.id, 5, late).expect("snooze"));

    let snoozed = engine.get(task.id).expect("task present");
    assert_eq!(snoozed.due_at, late + Duration::minutes(5));
}

#[test]
fn snooze_on_dispatch_defers_the_next_fire() {
    // Scenario: task due in 1 minute, the reminder choice snoozes by 5.
    let fires: Arc<Mutex<Vec<uuid::Uuid>>> = Arc::new(Mutex::new(Vec::new()));
    let fires_handle = fires.clone();
    let handler = move |task: &Task| {
        fires_handle.lock().expect("fires lock").push(task.id);
        ReminderAction::Snooze(5)
    };

    let store = Arc::new(MemoryStore::new());
    let (mut engine, _notifier) = engine_with(store, Box::new(handler));

    let now = t0();
    let task = engine
        .add(draft("Kettle", now + Duration::minutes(1)), now)
        .expect("add");

    let fired = engine.pump(now + Duration::minutes(1)).expect("pump");
    assert_eq!(fired, vec![task.id]);

    // Not before five minutes after the first fire.
    let fired = engine.pump(now + Duration::minutes(5)).expect("pump");
    assert!(fired.is_empty());

    let fired = engine.pump(now + Duration::minutes(6)).expect("pump");
    assert_eq!(fired, vec![task.id]);

    assert_eq!(fires.lock().expect("fires lock").len(), 2);
}

#[test]
fn snooze_message_converges_on_the_same_coordinator() {
    let store = Arc::new(MemoryStore::new());
    let (mut engine, _notifier) = engine_with(store, Box::new(AutoComplete));

    let now = t0();
    let due = now + Duration::minutes(20);
    let task = engine.add(draft("Laundry", due), now).expect("add");

    // Cross-context path: a notification action posts the message instead
    // of calling snooze directly.
    engine.post(Message::Snooze {
        id: task.id,
        minutes: 15,
    });
    let fired = engine.pump(now).expect("pump");
    assert!(fired.is_empty());

    let snoozed = engine.get(task.id).expect("task present");
    assert_eq!(snoozed.due_at, due + Duration::minutes(15));
    assert!(engine.timers().is_armed(task.id));
}

#[test]
fn invalid_snooze_message_is_dropped_without_failing_the_pump() {
    let store = Arc::new(MemoryStore::new());
    let (mut engine, _notifier) = engine_with(store, Box::new(AutoComplete));

    let now = t0();
    let due = now + Duration::minutes(20);
    let task = engine.add(draft("Stubborn", due), now).expect("add");

    // A non-positive delta from the message path is dropped, not an error
    // out of the pump.
    engine.post(Message::Snooze {
        id: task.id,
        minutes: 0,
    });
    let fired = engine.pump(now).expect("pump");

    assert!(fired.is_empty());
    let unchanged = engine.get(task.id).expect("task present");
    assert_eq!(unchanged.due_at, due);
    assert!(engine.timers().is_armed(task.id));
}

#[test]
fn snooze_message_for_deleted_task_is_a_silent_noop() {
    let store = Arc::new(MemoryStore::new());
    let (mut engine, notifier) = engine_with(store.clone(), Box::new(AutoComplete));

    let now = t0();
    let task = engine
        .add(draft("Ephemeral", now + Duration::minutes(3)), now)
        .expect("add");
    assert!(engine.remove(task.id).expect("remove"));

    // The message arrives after the deletion, as a background notification
    // action legitimately can.
    engine.post(Message::Snooze {
        id: task.id,
        minutes: 10,
    });
    let fired = engine.pump(now + Duration::minutes(30)).expect("pump");

    assert!(fired.is_empty());
    assert!(notifier.shown_ids().is_empty());
    assert!(engine.tasks().is_empty());
    assert!(store.read_all().expect("read").is_empty());
}

#[test]
fn snooze_on_completed_task_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let (mut engine, _notifier) = engine_with(store, Box::new(AutoComplete));

    let now = t0();
    let task = engine
        .add(draft("Already handled", now + Duration::minutes(3)), now)
        .expect("add");
    assert!(engine.toggle_done(task.id, now).expect("toggle"));

    assert!(!engine.snooze(task.id, 10, now).expect("snooze"));
    assert!(!engine.timers().is_armed(task.id));
}
