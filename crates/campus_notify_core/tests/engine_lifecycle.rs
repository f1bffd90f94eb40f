use campus_notify_core::{
    Clock, EngineError, InMemoryNotificationRepository, NewNotification, NotificationEngine,
    NotificationType, Priority, ValidationError, Viewer,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Clock that advances one second per reading.
struct SteppingClock(Mutex<DateTime<Utc>>);

impl SteppingClock {
    fn starting_at(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.0.lock();
        let now = *current;
        *current = now + Duration::seconds(1);
        now
    }
}

fn engine() -> NotificationEngine {
    let start = Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap();
    NotificationEngine::builder(Arc::new(InMemoryNotificationRepository::new()))
        .clock(Arc::new(SteppingClock::starting_at(start)))
        .open()
}

fn to_roles(kind: NotificationType, title: &str, roles: &[&str]) -> NewNotification {
    NewNotification::new(kind, title, "body").to_roles(roles.iter().copied())
}

#[test]
fn create_assigns_identity_timestamp_and_unread_state() {
    let engine = engine();

    let created = engine
        .create(to_roles(NotificationType::Announcement, "Assembly", &["student"]))
        .unwrap();

    assert!(!created.id.is_nil());
    assert!(!created.read);
    assert_eq!(created.created_at, Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap());
    assert_eq!(engine.get(created.id), Some(created));
}

#[test]
fn created_ids_are_pairwise_distinct() {
    let engine = engine();
    let mut ids = HashSet::new();

    for index in 0..200 {
        let created = engine
            .create(to_roles(NotificationType::Message, &format!("m{index}"), &["all"]))
            .unwrap();
        assert!(ids.insert(created.id));
    }
    assert_eq!(engine.len(), 200);
}

#[test]
fn empty_target_roles_is_rejected_without_changing_store() {
    let engine = engine();
    engine
        .create(to_roles(NotificationType::System, "kept", &["all"]))
        .unwrap();

    let err = engine
        .create(NewNotification::new(NotificationType::System, "bad", "no audience"))
        .unwrap_err();

    assert_eq!(err, EngineError::Validation(ValidationError::EmptyTargetRoles));
    assert_eq!(engine.len(), 1);
}

#[test]
fn role_scoped_notification_reaches_every_user_of_that_role() {
    let engine = engine();
    let created = engine
        .create(to_roles(NotificationType::ExamSubmitted, "Review", &["teacher"]))
        .unwrap();

    for viewer in [Viewer::user("teacher", "alice"), Viewer::user("teacher", "bob")] {
        let visible = engine.visible_for(&viewer);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, created.id);
    }
    assert!(engine.visible_for(&Viewer::user("student", "alice")).is_empty());
}

#[test]
fn user_scoped_notification_reaches_only_that_user() {
    let engine = engine();
    engine
        .create(
            to_roles(NotificationType::ExamGraded, "Graded", &["student"]).to_user("bob"),
        )
        .unwrap();

    assert_eq!(engine.visible_for(&Viewer::user("student", "bob")).len(), 1);
    assert!(engine.visible_for(&Viewer::user("student", "alice")).is_empty());
    assert!(engine.visible_for(&Viewer::role_only("student")).is_empty());
}

#[test]
fn mark_read_is_idempotent_and_decrements_once() {
    let engine = engine();
    let viewer = Viewer::user("student", "x");
    let created = engine
        .create(to_roles(NotificationType::ExamAvailable, "Quiz", &["student"]))
        .unwrap();
    engine
        .create(to_roles(NotificationType::ExamAvailable, "Quiz 2", &["student"]))
        .unwrap();
    assert_eq!(engine.unread_count_for(&viewer), 2);

    assert!(engine.mark_read(created.id));
    assert_eq!(engine.unread_count_for(&viewer), 1);

    assert!(!engine.mark_read(created.id));
    assert_eq!(engine.unread_count_for(&viewer), 1);
    assert!(engine.get(created.id).unwrap().read);
}

#[test]
fn mark_read_of_unknown_id_is_a_no_op() {
    let engine = engine();
    assert!(!engine.mark_read(Uuid::new_v4()));
    assert!(!engine.delete(Uuid::new_v4()));
}

#[test]
fn mark_all_read_only_touches_viewer_audience() {
    let engine = engine();
    let viewer = Viewer::user("student", "ana");
    engine
        .create(to_roles(NotificationType::Announcement, "All hands", &["all"]))
        .unwrap();
    engine
        .create(to_roles(NotificationType::ExamGraded, "Yours", &["student"]).to_user("ana"))
        .unwrap();
    let other_student = engine
        .create(to_roles(NotificationType::ExamGraded, "Theirs", &["student"]).to_user("ben"))
        .unwrap();
    let teacher_only = engine
        .create(to_roles(NotificationType::ExamApproved, "Staff", &["teacher"]))
        .unwrap();

    assert_eq!(engine.mark_all_read(&viewer), 2);
    assert_eq!(engine.unread_count_for(&viewer), 0);
    assert!(!engine.get(other_student.id).unwrap().read);
    assert!(!engine.get(teacher_only.id).unwrap().read);

    assert_eq!(engine.mark_all_read(&viewer), 0);
}

#[test]
fn delete_is_terminal() {
    let engine = engine();
    let viewer = Viewer::role_only("manager");
    let created = engine
        .create(to_roles(NotificationType::System, "Maintenance", &["manager"]))
        .unwrap();

    assert!(engine.delete(created.id));
    assert!(engine.visible_for(&viewer).iter().all(|n| n.id != created.id));
    assert!(!engine.delete(created.id));
    assert!(engine.get(created.id).is_none());
}

#[test]
fn visible_for_orders_newest_first() {
    let engine = engine();
    let t1 = engine
        .create(to_roles(NotificationType::Message, "t1", &["teacher"]))
        .unwrap();
    let t2 = engine
        .create(to_roles(NotificationType::Message, "t2", &["teacher"]))
        .unwrap();
    let t3 = engine
        .create(to_roles(NotificationType::Message, "t3", &["teacher"]))
        .unwrap();

    let ids: Vec<_> = engine
        .visible_for(&Viewer::role_only("teacher"))
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ids, vec![t3.id, t2.id, t1.id]);

    let recent: Vec<_> = engine
        .recent_for(&Viewer::role_only("teacher"), 2)
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(recent, vec![t3.id, t2.id]);
}

#[test]
fn midterm_scenario_runs_end_to_end() {
    let engine = engine();
    let viewer = Viewer::user("student", "x");

    let created = engine
        .create(
            NewNotification::new(NotificationType::ExamAvailable, "Midterm Ready", "Good luck")
                .to_roles(["student"]),
        )
        .unwrap();
    assert_eq!(engine.unread_count_for(&viewer), 1);

    engine.mark_read(created.id);
    assert_eq!(engine.unread_count_for(&viewer), 0);

    engine.delete(created.id);
    assert!(engine.visible_for(&viewer).is_empty());
}

#[test]
fn clear_all_for_removes_exactly_the_visible_set() {
    let engine = engine();
    let viewer = Viewer::user("teacher", "t-1");
    engine
        .create(to_roles(NotificationType::Announcement, "Everyone", &["all"]))
        .unwrap();
    engine
        .create(to_roles(NotificationType::ExamApproved, "Mine", &["teacher"]).to_user("t-1"))
        .unwrap();
    let survivor = engine
        .create(to_roles(NotificationType::ExamAvailable, "Students", &["student"]))
        .unwrap();

    assert_eq!(engine.clear_all_for(&viewer), 2);
    assert!(engine.visible_for(&viewer).is_empty());
    assert_eq!(engine.len(), 1);
    assert!(engine.get(survivor.id).is_some());
}

#[test]
fn clear_all_is_global() {
    let engine = engine();
    engine
        .create(to_roles(NotificationType::Message, "a", &["student"]))
        .unwrap();
    engine
        .create(to_roles(NotificationType::Message, "b", &["teacher"]).priority(Priority::Low))
        .unwrap();

    assert_eq!(engine.clear_all(), 2);
    assert!(engine.is_empty());
    assert_eq!(engine.clear_all(), 0);
}

#[test]
fn type_filter_returns_only_matching_kind() {
    let engine = engine();
    let viewer = Viewer::role_only("student");
    engine
        .create(to_roles(NotificationType::AssignmentDue, "Essay", &["student"]))
        .unwrap();
    engine
        .create(to_roles(NotificationType::Announcement, "Trip", &["student"]))
        .unwrap();

    let due = engine.visible_of_type(&viewer, NotificationType::AssignmentDue);
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].title, "Essay");
}
