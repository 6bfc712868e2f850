mod common;

use std::sync::atomic::Ordering;

use chrono::Duration;
use tickler_core::engine::AutoComplete;
use tickler_core::store::Store;

use common::{draft, engine_with_failing_store, t0};

#[test]
fn failed_write_on_add_surfaces_but_keeps_memory_state() {
    let (mut engine, inner, fail_writes, _notifier) =
        engine_with_failing_store(Box::new(AutoComplete));

    let now = t0();
    fail_writes.store(true, Ordering::SeqCst);

    let err = engine
        .add(draft("Unsaved", now + Duration::minutes(10)), now)
        .expect_err("write failure must surface");
    assert!(!err.is_validation());

    // The in-memory map is the session authority: the task stays, armed,
    // even though the durable write never landed.
    let tasks = engine.tasks();
    assert_eq!(tasks.len(), 1);
    assert!(engine.timers().is_armed(tasks[0].id));
    assert!(inner.read_all().expect("read").is_empty());
}

#[test]
fn failed_write_on_snooze_keeps_the_timer_armed() {
    let (mut engine, inner, fail_writes, _notifier) =
        engine_with_failing_store(Box::new(AutoComplete));

    let now = t0();
    let due = now + Duration::minutes(10);
    let task = engine.add(draft("Flaky disk", due), now).expect("add");

    fail_writes.store(true, Ordering::SeqCst);
    let err = engine
        .snooze(task.id, 5, now)
        .expect_err("write failure must surface");
    assert!(!err.is_validation());

    // The due time moved forward in memory and the timer tracks it; the
    // durable copy still holds the old due time.
    let snoozed = engine.get(task.id).expect("task present");
    assert_eq!(snoozed.due_at, due + Duration::minutes(5));
    assert!(engine.timers().is_armed(task.id));
    assert_eq!(inner.read_all().expect("read")[0].due_at, due);

    // The reminder still fires this session, at the snoozed time.
    fail_writes.store(false, Ordering::SeqCst);
    let fired = engine.pump(due + Duration::minutes(5)).expect("pump");
    assert_eq!(fired, vec![task.id]);
}

#[test]
fn failed_write_on_toggle_surfaces_but_keeps_memory_state() {
    let (mut engine, inner, fail_writes, _notifier) =
        engine_with_failing_store(Box::new(AutoComplete));

    let now = t0();
    let task = engine
        .add(draft("Half saved", now + Duration::minutes(10)), now)
        .expect("add");

    fail_writes.store(true, Ordering::SeqCst);
    let err = engine
        .toggle_done(task.id, now)
        .expect_err("write failure must surface");
    assert!(!err.is_validation());

    // Memory and timers agree with each other (done, no timer); only the
    // durable copy is stale.
    let toggled = engine.get(task.id).expect("task present");
    assert!(toggled.done);
    assert!(!engine.timers().is_armed(task.id));
    assert!(!inner.read_all().expect("read")[0].done);
}
