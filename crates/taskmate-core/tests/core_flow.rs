use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use taskmate_core::capabilities::{ManualClock, UuidGenerator};
use taskmate_core::storage::{FileStorage, Storage};
use taskmate_core::store::{DEFAULT_STORAGE_KEY, TaskStore, parse_blob};
use taskmate_core::{DashboardCounts, FilterStatus, NewTask, Priority, SortBy};
use tempfile::tempdir;

fn counts(total: usize, completed: usize, pending: usize) -> DashboardCounts {
    DashboardCounts {
        total,
        completed,
        pending,
    }
}

#[test]
fn add_toggle_delete_round_trip_through_disk() {
    let temp = tempdir().expect("tempdir");
    let now = Utc.with_ymd_and_hms(2026, 2, 16, 9, 0, 0).unwrap();
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let mut store = TaskStore::new(storage, ManualClock::new(now), UuidGenerator, DEFAULT_STORAGE_KEY);

    store.initialize().expect("initialize with no blob");
    assert_eq!(store.dashboard_counts(), counts(0, 0, 0));
    assert_eq!(store.storage().load(DEFAULT_STORAGE_KEY).expect("load"), None);

    let tomorrow = now + Duration::days(1);
    let task = store
        .add_task(NewTask::new("Buy milk", Some(tomorrow)).with_priority(Priority::Medium))
        .expect("add task");
    assert_eq!(store.dashboard_counts(), counts(1, 0, 1));
    let on_disk = |store: &TaskStore<FileStorage, ManualClock, UuidGenerator>| {
        let raw = store
            .storage()
            .load(DEFAULT_STORAGE_KEY)
            .expect("load")
            .expect("blob present");
        parse_blob(&raw).expect("parse blob")
    };
    assert_eq!(on_disk(&store), vec![task.clone()]);

    store.toggle_complete(&task.id).expect("toggle");
    assert_eq!(store.dashboard_counts(), counts(1, 1, 0));
    assert!(on_disk(&store)[0].completed);

    let reopened_storage = FileStorage::open(temp.path()).expect("reopen storage");
    let mut reopened = TaskStore::new(
        reopened_storage,
        ManualClock::new(now),
        UuidGenerator,
        DEFAULT_STORAGE_KEY,
    );
    reopened.initialize().expect("reload");
    assert_eq!(reopened.tasks(), store.tasks());

    store.delete_task(&task.id).expect("delete");
    assert_eq!(store.dashboard_counts(), counts(0, 0, 0));
    assert!(on_disk(&store).is_empty());
}

#[test]
fn many_adds_never_share_an_id() {
    let temp = tempdir().expect("tempdir");
    let now = Utc.with_ymd_and_hms(2026, 2, 16, 9, 0, 0).unwrap();
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let mut store = TaskStore::new(storage, ManualClock::new(now), UuidGenerator, "ids");
    store.initialize().expect("initialize");

    for idx in 0..200 {
        let priority = match idx % 3 {
            0 => Priority::Low,
            1 => Priority::Medium,
            _ => Priority::High,
        };
        store
            .add_task(NewTask::new(format!("task {idx}"), Some(now + Duration::hours(idx))).with_priority(priority))
            .expect("add");
    }

    let ids: HashSet<&str> = store.tasks().iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids.len(), 200);

    let by_priority = store.view(FilterStatus::All, SortBy::Priority);
    assert!(by_priority.windows(2).all(|pair| pair[0].priority.rank() <= pair[1].priority.rank()));
    assert_eq!(store.tasks()[0].name, "task 0");
}

#[test]
fn reads_blob_written_by_browser_build() {
    let temp = tempdir().expect("tempdir");
    let mut storage = FileStorage::open(temp.path()).expect("open storage");
    storage
        .save(
            DEFAULT_STORAGE_KEY,
            r#"[{"id":"6f1c9a52-8a43-4b7e-9a0e-2f51f6d1c001","name":"Pay rent","description":"","deadline":"2026-03-01T00:00:00.000Z","priority":"High","completed":false,"createdAt":"2026-02-10T08:15:30.123Z"}]"#,
        )
        .expect("seed blob");

    let now = Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap();
    let mut store = TaskStore::new(storage, ManualClock::new(now), UuidGenerator, DEFAULT_STORAGE_KEY);
    store.initialize().expect("initialize");

    let task = &store.tasks()[0];
    assert_eq!(task.name, "Pay rent");
    assert_eq!(task.priority, Priority::High);
    assert_eq!(
        task.created_at,
        Utc.with_ymd_and_hms(2026, 2, 10, 8, 15, 30).unwrap() + Duration::milliseconds(123)
    );
    assert!(taskmate_core::view::is_deadline_near(task.deadline, now));
}
