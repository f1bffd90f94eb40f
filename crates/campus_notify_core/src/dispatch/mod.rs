//! Domain events and best-effort subscriber fan-out.
//!
//! # Responsibility
//! - Publish engine events to registered subscribers.
//! - Contain subscriber failures (errors and panics) at the bus boundary.
//!
//! # Invariants
//! - Each subscriber sees each event exactly once; there is no retry or
//!   queueing.
//! - A failing subscriber never affects the publisher or other subscribers.

use crate::model::audience::Viewer;
use crate::model::notification::{Notification, NotificationId};
use log::{debug, warn};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

pub mod toast;

pub use toast::{LogToastSink, Toast, ToastAnnouncer, ToastPolicy, ToastSink};

/// Failure reported by one subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("presentation sink unavailable: {0}")]
    SinkUnavailable(String),
    #[error("subscriber rejected event: {0}")]
    Rejected(String),
}

/// Engine-side changes observable by host collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    Created(Notification),
    Read { id: NotificationId },
    AllRead { viewer: Viewer, ids: Vec<NotificationId> },
    Deleted { id: NotificationId },
    /// `viewer` is `None` for the global clear.
    Cleared { viewer: Option<Viewer>, removed: usize },
}

impl NotificationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Read { .. } => "read",
            Self::AllRead { .. } => "all_read",
            Self::Deleted { .. } => "deleted",
            Self::Cleared { .. } => "cleared",
        }
    }
}

/// Receiver of engine events (toasts, cross-tab sync, audit, ...).
///
/// Events arrive synchronously on the mutating thread, in commit order.
/// Later mutations wait until every subscriber has returned, so handlers
/// must not block; move slow work to a queue of your own.
pub trait NotificationSubscriber: Send + Sync {
    /// Stable name used in log events.
    fn name(&self) -> &str;

    fn on_event(&self, event: &NotificationEvent) -> Result<(), DispatchError>;
}

/// Registry of subscribers. Publishing never fails.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Arc<dyn NotificationSubscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn NotificationSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Delivers `event` once to every subscriber.
    ///
    /// Returns the number of subscribers that handled it without error.
    pub fn publish(&self, event: &NotificationEvent) -> usize {
        // Snapshot so subscribers may subscribe others without deadlocking.
        let subscribers: Vec<_> = self.subscribers.read().iter().cloned().collect();
        let mut delivered = 0;

        for subscriber in subscribers {
            let outcome = catch_unwind(AssertUnwindSafe(|| subscriber.on_event(event)));
            match outcome {
                Ok(Ok(())) => {
                    delivered += 1;
                    debug!(
                        "event=dispatch module=dispatch status=ok kind={} subscriber={}",
                        event.name(),
                        subscriber.name()
                    );
                }
                Ok(Err(err)) => warn!(
                    "event=dispatch module=dispatch status=error kind={} subscriber={} error={}",
                    event.name(),
                    subscriber.name(),
                    err
                ),
                Err(_) => warn!(
                    "event=dispatch module=dispatch status=panic kind={} subscriber={}",
                    event.name(),
                    subscriber.name()
                ),
            }
        }

        delivered
    }
}
