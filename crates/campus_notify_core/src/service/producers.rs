//! Payload builders for the school workflows that raise notifications.
//!
//! Each helper only shapes a `NewNotification`; validation and delivery stay
//! with `NotificationEngine::create`.

use crate::model::audience::{
    ALL_ROLES, ROLE_SCHOOL_ADMINISTRATOR, ROLE_STUDENT, ROLE_TEACHER,
};
use crate::model::notification::{Metadata, NewNotification, NotificationType, Priority};
use serde_json::Value;

const EXAM_ID_KEY: &str = "examId";
const QUESTION_ID_KEY: &str = "questionId";

fn exam_metadata(exam_id: &str) -> Metadata {
    Metadata::from([(EXAM_ID_KEY.to_string(), Value::from(exam_id))])
}

fn question_metadata(question_id: &str) -> Metadata {
    Metadata::from([(QUESTION_ID_KEY.to_string(), Value::from(question_id))])
}

/// Teacher submitted an exam; administrators review it.
pub fn exam_submitted(exam_id: &str, exam_title: &str, teacher_name: &str) -> NewNotification {
    NewNotification::new(
        NotificationType::ExamSubmitted,
        "New Exam Submitted",
        format!("{teacher_name} submitted \"{exam_title}\" for approval."),
    )
    .priority(Priority::High)
    .to_roles([ROLE_SCHOOL_ADMINISTRATOR])
    .action_url(format!("/admin/exams/{exam_id}"))
    .metadata(exam_metadata(exam_id))
}

/// Exam approved; tells the submitting teacher.
pub fn exam_approved(exam_id: &str, exam_title: &str, teacher_id: &str) -> NewNotification {
    NewNotification::new(
        NotificationType::ExamApproved,
        "Exam Approved",
        format!("Your exam \"{exam_title}\" has been approved."),
    )
    .to_roles([ROLE_TEACHER])
    .to_user(teacher_id)
    .action_url(format!("/teacher/exams/{exam_id}"))
    .metadata(exam_metadata(exam_id))
}

/// Exam rejected with a reviewer reason; tells the submitting teacher.
pub fn exam_rejected(
    exam_id: &str,
    exam_title: &str,
    teacher_id: &str,
    reason: &str,
) -> NewNotification {
    let mut metadata = exam_metadata(exam_id);
    metadata.insert("reason".to_string(), Value::from(reason));

    NewNotification::new(
        NotificationType::ExamRejected,
        "Exam Rejected",
        format!("Your exam \"{exam_title}\" was rejected: {reason}"),
    )
    .priority(Priority::High)
    .to_roles([ROLE_TEACHER])
    .to_user(teacher_id)
    .action_url(format!("/teacher/exams/{exam_id}"))
    .metadata(metadata)
}

/// Approved exam published to every student.
pub fn exam_available(exam_id: &str, exam_title: &str) -> NewNotification {
    NewNotification::new(
        NotificationType::ExamAvailable,
        "New Exam Available",
        format!("\"{exam_title}\" is now available."),
    )
    .to_roles([ROLE_STUDENT])
    .action_url(format!("/student/exams/{exam_id}"))
    .metadata(exam_metadata(exam_id))
}

/// Grade posted for one student.
pub fn exam_graded(exam_id: &str, exam_title: &str, student_id: &str) -> NewNotification {
    NewNotification::new(
        NotificationType::ExamGraded,
        "Exam Graded",
        format!("Your result for \"{exam_title}\" is ready."),
    )
    .to_roles([ROLE_STUDENT])
    .to_user(student_id)
    .action_url(format!("/student/results/{exam_id}"))
    .metadata(exam_metadata(exam_id))
}

/// Teacher submitted a bank question for review.
pub fn question_submitted(question_id: &str, teacher_name: &str) -> NewNotification {
    NewNotification::new(
        NotificationType::QuestionSubmitted,
        "New Question Submitted",
        format!("{teacher_name} submitted a question for review."),
    )
    .to_roles([ROLE_SCHOOL_ADMINISTRATOR])
    .action_url(format!("/admin/questions/{question_id}"))
    .metadata(question_metadata(question_id))
}

/// Review outcome for a submitted question.
pub fn question_reviewed(question_id: &str, teacher_id: &str, approved: bool) -> NewNotification {
    let (kind, title, verdict) = if approved {
        (NotificationType::QuestionApproved, "Question Approved", "approved")
    } else {
        (NotificationType::QuestionRejected, "Question Rejected", "rejected")
    };

    NewNotification::new(kind, title, format!("Your question was {verdict}."))
        .to_roles([ROLE_TEACHER])
        .to_user(teacher_id)
        .action_url(format!("/teacher/questions/{question_id}"))
        .metadata(question_metadata(question_id))
}

/// School announcement. An empty `roles` list addresses everyone.
pub fn announcement(
    title: &str,
    message: &str,
    roles: &[&str],
    priority: Priority,
) -> NewNotification {
    let roles: Vec<&str> = if roles.is_empty() {
        vec![ALL_ROLES]
    } else {
        roles.to_vec()
    };
    NewNotification::new(NotificationType::Announcement, title, message)
        .priority(priority)
        .to_roles(roles)
}

/// Platform message for everyone (maintenance windows, outages).
pub fn system_message(title: &str, message: &str, priority: Priority) -> NewNotification {
    NewNotification::new(NotificationType::System, title, message)
        .priority(priority)
        .to_roles([ALL_ROLES])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_submitted_targets_administrators_only() {
        let payload = exam_submitted("e-1", "Algebra Final", "Ms. Diaz");
        assert_eq!(payload.target_roles, vec![ROLE_SCHOOL_ADMINISTRATOR]);
        assert_eq!(payload.target_user_id, None);
        assert_eq!(payload.metadata.unwrap()["examId"], "e-1");
    }

    #[test]
    fn rejected_question_uses_rejected_type() {
        let payload = question_reviewed("q-9", "t-1", false);
        assert_eq!(payload.kind, NotificationType::QuestionRejected);
        assert_eq!(payload.target_user_id.as_deref(), Some("t-1"));
    }

    #[test]
    fn announcement_without_roles_goes_to_all() {
        let payload = announcement("Snow day", "School closed", &[], Priority::Urgent);
        assert_eq!(payload.target_roles, vec![ALL_ROLES]);
    }
}
