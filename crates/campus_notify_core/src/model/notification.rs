//! Notification record model.
//!
//! # Responsibility
//! - Define the canonical notification record owned by the engine.
//! - Validate producer input before a record is ever stored.
//!
//! # Invariants
//! - `id` is assigned by the engine and never reused.
//! - `read` only moves from `false` to `true`.
//! - `created_at` comes from the engine clock, never from the producer.
//! - Every field except `read` is immutable after creation.

use crate::model::audience::{is_addressed_to, TargetRoles, Viewer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier for one stored notification.
pub type NotificationId = Uuid;

/// Engine-opaque key/value bag attached by producers.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Validation failures raised while building or restoring a notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("target roles must contain at least one role or `all`")]
    EmptyTargetRoles,
    #[error("target roles must not contain blank entries")]
    BlankRole,
    #[error("target user id must not be blank when present")]
    BlankTargetUser,
    #[error("notification id must not be nil")]
    NilId,
}

/// Closed set of notification kinds produced by the school workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ExamSubmitted,
    ExamApproved,
    ExamRejected,
    QuestionSubmitted,
    QuestionApproved,
    QuestionRejected,
    ExamAvailable,
    ExamGraded,
    Announcement,
    AssignmentDue,
    Message,
    System,
}

impl NotificationType {
    pub const ALL: [NotificationType; 12] = [
        Self::ExamSubmitted,
        Self::ExamApproved,
        Self::ExamRejected,
        Self::QuestionSubmitted,
        Self::QuestionApproved,
        Self::QuestionRejected,
        Self::ExamAvailable,
        Self::ExamGraded,
        Self::Announcement,
        Self::AssignmentDue,
        Self::Message,
        Self::System,
    ];

    /// Stable wire value (matches serde form).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExamSubmitted => "exam_submitted",
            Self::ExamApproved => "exam_approved",
            Self::ExamRejected => "exam_rejected",
            Self::QuestionSubmitted => "question_submitted",
            Self::QuestionApproved => "question_approved",
            Self::QuestionRejected => "question_rejected",
            Self::ExamAvailable => "exam_available",
            Self::ExamGraded => "exam_graded",
            Self::Announcement => "announcement",
            Self::AssignmentDue => "assignment_due",
            Self::Message => "message",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }

    /// Human-readable label shown next to the notification.
    pub fn label(self) -> &'static str {
        match self {
            Self::ExamSubmitted => "Exam Submitted",
            Self::ExamApproved => "Exam Approved",
            Self::ExamRejected => "Exam Rejected",
            Self::QuestionSubmitted => "Question Submitted",
            Self::QuestionApproved => "Question Approved",
            Self::QuestionRejected => "Question Rejected",
            Self::ExamAvailable => "New Exam",
            Self::ExamGraded => "Exam Graded",
            Self::Announcement => "Announcement",
            Self::AssignmentDue => "Assignment Due",
            Self::Message => "Message",
            Self::System => "System",
        }
    }

    /// Icon key resolved by the presentation layer.
    pub fn icon(self) -> &'static str {
        match self {
            Self::ExamSubmitted | Self::QuestionSubmitted => "file-text",
            Self::ExamApproved | Self::QuestionApproved => "check-circle",
            Self::ExamRejected | Self::QuestionRejected => "x-circle",
            Self::ExamAvailable => "book-open",
            Self::ExamGraded => "award",
            Self::Announcement => "megaphone",
            Self::AssignmentDue => "clock",
            Self::Message => "message-square",
            Self::System => "bell",
        }
    }
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation weight. Never affects delivery or visibility.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Producer payload for `create`.
///
/// Identity, timestamp and read state are intentionally absent; the engine
/// assigns them.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    /// Raw role ids; validated into `TargetRoles` at create time.
    pub target_roles: Vec<String>,
    pub target_user_id: Option<String>,
    pub action_url: Option<String>,
    pub metadata: Option<Metadata>,
}

impl NewNotification {
    pub fn new(
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            priority: Priority::Normal,
            target_roles: Vec::new(),
            target_user_id: None,
            action_url: None,
            metadata: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn to_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn to_user(mut self, user_id: impl Into<String>) -> Self {
        self.target_user_id = Some(user_id.into());
        self
    }

    pub fn action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Canonical stored notification.
///
/// Serialized with camelCase field names; `kind` is stored as `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub target_roles: TargetRoles,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Notification {
    /// Builds an unread record from producer input.
    ///
    /// # Errors
    /// - Any `ValidationError` from role or user validation; nothing is
    ///   allocated for the caller to clean up.
    pub fn from_new(
        id: NotificationId,
        created_at: DateTime<Utc>,
        input: NewNotification,
    ) -> Result<Self, ValidationError> {
        if id.is_nil() {
            return Err(ValidationError::NilId);
        }
        let target_roles = TargetRoles::from_roles(&input.target_roles)?;
        let target_user_id = normalize_target_user(input.target_user_id)?;

        Ok(Self {
            id,
            kind: input.kind,
            title: input.title,
            message: input.message,
            priority: input.priority,
            read: false,
            created_at,
            target_roles,
            target_user_id,
            action_url: input.action_url,
            metadata: input.metadata,
        })
    }

    /// Re-checks invariants on a record restored from storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        if let TargetRoles::Roles(roles) = &self.target_roles {
            if roles.is_empty() {
                return Err(ValidationError::EmptyTargetRoles);
            }
        }
        if matches!(self.target_user_id.as_deref(), Some(user) if user.trim().is_empty()) {
            return Err(ValidationError::BlankTargetUser);
        }
        Ok(())
    }

    /// Marks the record read. Returns whether state changed.
    pub fn mark_read(&mut self) -> bool {
        if self.read {
            return false;
        }
        self.read = true;
        true
    }

    pub fn is_visible_to(&self, viewer: &Viewer) -> bool {
        is_addressed_to(&self.target_roles, self.target_user_id.as_deref(), viewer)
    }

    pub fn is_unread_for(&self, viewer: &Viewer) -> bool {
        !self.read && self.is_visible_to(viewer)
    }
}

fn normalize_target_user(user_id: Option<String>) -> Result<Option<String>, ValidationError> {
    match user_id {
        None => Ok(None),
        Some(user) => {
            let trimmed = user.trim();
            if trimmed.is_empty() {
                return Err(ValidationError::BlankTargetUser);
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}
