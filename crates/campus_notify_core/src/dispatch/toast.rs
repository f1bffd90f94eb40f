//! Toast announcements for newly created notifications.
//!
//! Fire-and-forget: one attempt per created notification, no retry.

use crate::config::ToastConfig;
use crate::dispatch::{DispatchError, NotificationEvent, NotificationSubscriber};
use crate::model::notification::{Notification, NotificationId, NotificationType, Priority};
use log::info;
use std::time::Duration;

/// Priority to on-screen duration mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastPolicy {
    default_duration: Duration,
    urgent_duration: Duration,
}

impl ToastPolicy {
    pub fn new(config: &ToastConfig) -> Self {
        Self {
            default_duration: Duration::from_millis(config.default_duration_ms),
            urgent_duration: Duration::from_millis(config.urgent_duration_ms),
        }
    }

    /// Urgent toasts stay longer; every other priority shares the default.
    pub fn duration_for(&self, priority: Priority) -> Duration {
        match priority {
            Priority::Urgent => self.urgent_duration,
            Priority::Low | Priority::Normal | Priority::High => self.default_duration,
        }
    }
}

impl Default for ToastPolicy {
    fn default() -> Self {
        Self::new(&ToastConfig::default())
    }
}

/// Presentation payload handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub notification_id: NotificationId,
    pub kind: NotificationType,
    pub label: &'static str,
    pub icon: &'static str,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub duration: Duration,
    pub action_url: Option<String>,
}

/// Presentation-layer surface that renders toasts.
///
/// `show` runs on the thread that called `create`, before `create` returns.
/// Implementations must hand the toast off (queue, channel, UI event loop)
/// and return without waiting for it to be displayed or dismissed.
pub trait ToastSink: Send + Sync {
    fn show(&self, toast: Toast) -> Result<(), DispatchError>;
}

/// Sink that only records the toast in the log (headless hosts).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogToastSink;

impl ToastSink for LogToastSink {
    fn show(&self, toast: Toast) -> Result<(), DispatchError> {
        info!(
            "event=toast_shown module=dispatch status=ok id={} type={} priority={} duration_ms={}",
            toast.notification_id,
            toast.kind,
            toast.priority.as_str(),
            toast.duration.as_millis()
        );
        Ok(())
    }
}

/// Subscriber turning `Created` events into toasts.
pub struct ToastAnnouncer<S: ToastSink> {
    policy: ToastPolicy,
    sink: S,
}

impl<S: ToastSink> ToastAnnouncer<S> {
    pub fn new(policy: ToastPolicy, sink: S) -> Self {
        Self { policy, sink }
    }

    pub fn build_toast(&self, notification: &Notification) -> Toast {
        Toast {
            notification_id: notification.id,
            kind: notification.kind,
            label: notification.kind.label(),
            icon: notification.kind.icon(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            priority: notification.priority,
            duration: self.policy.duration_for(notification.priority),
            action_url: notification.action_url.clone(),
        }
    }
}

impl<S: ToastSink> NotificationSubscriber for ToastAnnouncer<S> {
    fn name(&self) -> &str {
        "toast"
    }

    fn on_event(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
        match event {
            NotificationEvent::Created(notification) => {
                self.sink.show(self.build_toast(notification))
            }
            _ => Ok(()),
        }
    }
}
