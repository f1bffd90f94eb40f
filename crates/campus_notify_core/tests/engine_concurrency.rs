use campus_notify_core::{
    InMemoryNotificationRepository, NewNotification, NotificationEngine, NotificationType, Viewer,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

const WRITERS: usize = 8;
const PER_WRITER: usize = 50;

fn payload(index: usize) -> NewNotification {
    NewNotification::new(NotificationType::Message, format!("m{index}"), "body").to_roles(["student"])
}

#[test]
fn concurrent_creates_keep_every_record_and_snapshot() {
    let repo = Arc::new(InMemoryNotificationRepository::new());
    let engine = Arc::new(NotificationEngine::builder(repo.clone()).open());

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                (0..PER_WRITER)
                    .map(|index| engine.create(payload(writer * PER_WRITER + index)).unwrap().id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: HashSet<_> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(ids.len(), WRITERS * PER_WRITER);
    assert_eq!(engine.len(), WRITERS * PER_WRITER);
    assert_eq!(repo.snapshot().len(), WRITERS * PER_WRITER);
}

#[test]
fn racing_mark_read_and_delete_never_fail_and_counts_stay_consistent() {
    let engine = Arc::new(
        NotificationEngine::builder(Arc::new(InMemoryNotificationRepository::new())).open(),
    );
    let ids: Vec<_> = (0..100)
        .map(|index| engine.create(payload(index)).unwrap().id)
        .collect();
    let ids = Arc::new(ids);
    let viewer = Viewer::user("student", "s-1");

    let markers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let ids = Arc::clone(&ids);
            thread::spawn(move || {
                let changed: usize = ids.iter().filter(|id| engine.mark_read(**id)).count();
                changed
            })
        })
        .collect();
    let deleter = {
        let engine = Arc::clone(&engine);
        let ids = Arc::clone(&ids);
        thread::spawn(move || ids.iter().step_by(2).filter(|id| engine.delete(**id)).count())
    };
    let reader = {
        let engine = Arc::clone(&engine);
        let viewer = viewer.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let before = engine.unread_count_for(&viewer);
                let visible = engine.visible_for(&viewer);
                let after = engine.unread_count_for(&viewer);
                let unread = visible.iter().filter(|n| !n.read).count();
                // Marks and deletes only ever shrink the unread set.
                assert!(before >= unread && unread >= after);
            }
        })
    };

    let marked: usize = markers.into_iter().map(|h| h.join().unwrap()).sum();
    let deleted = deleter.join().unwrap();
    reader.join().unwrap();

    assert_eq!(deleted, 50);
    assert!(marked <= 100);
    assert_eq!(engine.len(), 50);
    assert_eq!(engine.unread_count_for(&viewer), 0, "every survivor was marked");
}

#[test]
fn readers_never_observe_a_partial_mark_all_read() {
    const RECORDS: usize = 200;
    let engine = Arc::new(
        NotificationEngine::builder(Arc::new(InMemoryNotificationRepository::new())).open(),
    );
    for index in 0..RECORDS {
        engine.create(payload(index)).unwrap();
    }
    engine
        .create(NewNotification::new(NotificationType::Message, "staff", "body").to_roles(["teacher"]))
        .unwrap();
    let viewer = Viewer::role_only("student");

    let reader = {
        let engine = Arc::clone(&engine);
        let viewer = viewer.clone();
        thread::spawn(move || {
            for _ in 0..500 {
                let before = engine.unread_count_for(&viewer);
                let visible = engine.visible_for(&viewer);
                let after = engine.unread_count_for(&viewer);
                let unread_in_view = visible.iter().filter(|n| !n.read).count();

                assert_eq!(visible.len(), RECORDS);
                assert!(unread_in_view == 0 || unread_in_view == RECORDS, "saw {unread_in_view}");
                assert!(before == 0 || before == RECORDS, "count {before}");
                assert!(after == 0 || after == RECORDS, "count {after}");
                // Reads only move from unread to read.
                assert!(before >= unread_in_view && unread_in_view >= after);
            }
        })
    };
    let marked = {
        let engine = Arc::clone(&engine);
        let viewer = viewer.clone();
        thread::spawn(move || engine.mark_all_read(&viewer))
    };

    assert_eq!(marked.join().unwrap(), RECORDS);
    reader.join().unwrap();
    assert_eq!(engine.unread_count_for(&viewer), 0);
    assert_eq!(engine.unread_count_for(&Viewer::role_only("teacher")), 1);
}
