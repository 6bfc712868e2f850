use chrono::{Duration, Utc};
use tempfile::tempdir;
use tickler_core::store::{FileStore, Store};
use tickler_core::task::{Category, Task};

#[test]
fn filestore_roundtrip_upsert_and_delete() {
    let temp = tempdir().expect("tempdir");
    let store = FileStore::open(temp.path()).expect("open store");

    let now = Utc::now();
    let mut task = Task::new(
        "Write parity harness".to_string(),
        Category::Work,
        now + Duration::minutes(30),
        now,
    );

    store.write_one(&task).expect("write task");
    let read = store.read_all().expect("read all");
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].id, task.id);
    assert_eq!(read[0].text, "Write parity harness");

    // Upsert with the same id replaces, not duplicates.
    task.done = true;
    store.write_one(&task).expect("rewrite task");
    let read = store.read_all().expect("read all");
    assert_eq!(read.len(), 1);
    assert!(read[0].done);

    store.delete_one(task.id).expect("delete");
    assert!(store.read_all().expect("read all").is_empty());
}

#[test]
fn filestore_orders_records_by_due_time() {
    let temp = tempdir().expect("tempdir");
    let store = FileStore::open(temp.path()).expect("open store");

    let now = Utc::now();
    let later = Task::new(
        "Later".to_string(),
        Category::Event,
        now + Duration::hours(2),
        now,
    );
    let sooner = Task::new(
        "Sooner".to_string(),
        Category::Event,
        now + Duration::hours(1),
        now,
    );

    store.write_one(&later).expect("write later");
    store.write_one(&sooner).expect("write sooner");

    let read = store.read_all().expect("read all");
    assert_eq!(read.len(), 2);
    assert_eq!(read[0].id, sooner.id);
    assert_eq!(read[1].id, later.id);
}

#[test]
fn filestore_reopen_preserves_records() {
    let temp = tempdir().expect("tempdir");
    let now = Utc::now();
    let task = Task::new(
        "Survives restart".to_string(),
        Category::Appointment,
        now + Duration::minutes(5),
        now,
    );

    {
        let store = FileStore::open(temp.path()).expect("open store");
        store.write_one(&task).expect("write task");
    }

    let store = FileStore::open(temp.path()).expect("reopen store");
    let read = store.read_all().expect("read all");
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].id, task.id);

    // Deleting an id that is not present is not an error.
    store.delete_one(uuid::Uuid::new_v4()).expect("delete missing");
}
