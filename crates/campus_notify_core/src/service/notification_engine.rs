//! Notification engine: the single owner of the notification set.
//!
//! # Responsibility
//! - Create, mark read, delete and clear notifications.
//! - Answer audience queries from a consistent snapshot.
//! - Write the full snapshot through the repository after every change.
//! - Publish domain events after the store lock is released, in commit
//!   order.
//!
//! # Invariants
//! - Mutations hold the write lock for their whole read-modify-write cycle,
//!   including the synchronous save.
//! - Readers take the read lock and never observe a half-applied mutation.
//! - A failed save is reported to the `PersistenceMonitor` and does not roll
//!   back the in-memory change; a crash before the next successful save
//!   loses that change.
//! - A store that fails to load is never overwritten: saves are skipped and
//!   reported to the monitor for the lifetime of the engine.
//! - Restored records are deduplicated by id whatever the adapter returned.
//! - Mutations are serialized end to end by the publish-order guard, so
//!   subscribers observe events in the order changes were applied.
//! - A rejected `create` changes nothing and publishes nothing.
//! - Missing ids are no-ops, never errors.

use crate::clock::{Clock, SystemClock};
use crate::config::{EngineConfig, ToastConfig};
use crate::dispatch::{
    EventBus, NotificationEvent, NotificationSubscriber, ToastAnnouncer, ToastPolicy, ToastSink,
};
use crate::model::audience::Viewer;
use crate::model::notification::{
    NewNotification, Notification, NotificationId, NotificationType, ValidationError,
};
use crate::repo::snapshot::retain_valid;
use crate::repo::{open_repository, NotificationRepository, RepoError, RepoResult};
use crate::targeting;
use log::{debug, error, info, warn};
use parking_lot::{ReentrantMutex, RwLock};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a caller's operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid notification: {0}")]
    Validation(#[from] ValidationError),
}

/// Which engine step touched the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOp {
    Load,
    Create,
    MarkRead,
    MarkAllRead,
    Delete,
    ClearAll,
    ClearAllFor,
}

impl PersistOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Create => "create",
            Self::MarkRead => "mark_read",
            Self::MarkAllRead => "mark_all_read",
            Self::Delete => "delete",
            Self::ClearAll => "clear_all",
            Self::ClearAllFor => "clear_all_for",
        }
    }
}

/// Monitoring hook for persistence failures.
///
/// Receives save/load errors that are not returned to the mutating caller.
pub trait PersistenceMonitor: Send + Sync {
    fn on_persistence_error(&self, op: PersistOp, medium: &str, error: &RepoError);
}

/// Default monitor: one `error!` line per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPersistenceMonitor;

impl PersistenceMonitor for LoggingPersistenceMonitor {
    fn on_persistence_error(&self, op: PersistOp, medium: &str, error: &RepoError) {
        error!(
            "event=persist module=engine status=error op={} medium={} error={}",
            op.as_str(),
            medium,
            error
        );
    }
}

/// Assembles an engine from its collaborators.
pub struct EngineBuilder {
    repo: Arc<dyn NotificationRepository>,
    clock: Arc<dyn Clock>,
    monitor: Arc<dyn PersistenceMonitor>,
    toast: ToastConfig,
    subscribers: Vec<Arc<dyn NotificationSubscriber>>,
}

impl EngineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn monitor(mut self, monitor: Arc<dyn PersistenceMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn toast_config(mut self, toast: ToastConfig) -> Self {
        self.toast = toast;
        self
    }

    pub fn subscriber(mut self, subscriber: Arc<dyn NotificationSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Registers a toast announcer using the builder's toast durations.
    pub fn toast_sink<S: ToastSink + 'static>(self, sink: S) -> Self {
        let announcer = ToastAnnouncer::new(ToastPolicy::new(&self.toast), sink);
        self.subscriber(Arc::new(announcer))
    }

    /// Restores the stored set and returns a ready engine.
    ///
    /// A load failure is reported to the monitor and the engine starts empty
    /// with writes suspended: the unreadable store is left as it is and every
    /// later save is reported as `RepoError::WritesSuspended`.
    pub fn open(self) -> NotificationEngine {
        let started_at = Instant::now();
        let (records, suspended_writes) = match self.repo.load_all() {
            Ok(loaded) => {
                let mut records = retain_valid(
                    loaded
                        .into_iter()
                        .enumerate()
                        .map(|(index, record)| (index, Ok::<_, String>(record))),
                );
                // Storage order is newest insertion first.
                targeting::sort_newest_first(&mut records);
                info!(
                    "event=engine_open module=engine status=ok medium={} records={} duration_ms={}",
                    self.repo.medium(),
                    records.len(),
                    started_at.elapsed().as_millis()
                );
                (records, None)
            }
            Err(err) => {
                self.monitor
                    .on_persistence_error(PersistOp::Load, self.repo.medium(), &err);
                warn!(
                    "event=engine_open module=engine status=writes_suspended medium={}",
                    self.repo.medium()
                );
                (Vec::new(), Some(err.to_string()))
            }
        };

        let events = EventBus::new();
        for subscriber in self.subscribers {
            events.subscribe(subscriber);
        }

        NotificationEngine {
            records: RwLock::new(records),
            publish_order: ReentrantMutex::new(()),
            suspended_writes,
            repo: self.repo,
            clock: self.clock,
            monitor: self.monitor,
            events,
        }
    }
}

/// Process-local notification engine. Share it behind an `Arc`.
pub struct NotificationEngine {
    /// Newest insertion first.
    records: RwLock<Vec<Notification>>,
    /// Held by a mutation from before it takes the store lock until its event
    /// is delivered. Reentrant so a subscriber may mutate from its callback.
    publish_order: ReentrantMutex<()>,
    /// Load failure that put the engine in write-suspended mode.
    suspended_writes: Option<String>,
    repo: Arc<dyn NotificationRepository>,
    clock: Arc<dyn Clock>,
    monitor: Arc<dyn PersistenceMonitor>,
    events: EventBus,
}

impl NotificationEngine {
    pub fn builder(repo: Arc<dyn NotificationRepository>) -> EngineBuilder {
        EngineBuilder {
            repo,
            clock: Arc::new(SystemClock),
            monitor: Arc::new(LoggingPersistenceMonitor),
            toast: ToastConfig::default(),
            subscribers: Vec::new(),
        }
    }

    /// Builder wired to the configured storage medium and toast durations.
    ///
    /// # Errors
    /// - Returns `RepoError` when the storage medium cannot be opened.
    pub fn builder_from_config(config: &EngineConfig) -> RepoResult<EngineBuilder> {
        let repo: Arc<dyn NotificationRepository> = Arc::from(open_repository(&config.storage)?);
        Ok(Self::builder(repo).toast_config(config.toast))
    }

    /// Registers an event subscriber after construction.
    pub fn subscribe(&self, subscriber: Arc<dyn NotificationSubscriber>) {
        self.events.subscribe(subscriber);
    }

    /// Validates, stores and announces a new notification.
    ///
    /// # Errors
    /// - `EngineError::Validation` when the payload is invalid; the store is
    ///   untouched and no event is published.
    pub fn create(&self, input: NewNotification) -> EngineResult<Notification> {
        let kind = input.kind;
        let _order = self.publish_order.lock();
        let created = {
            let mut records = self.records.write();
            let id = fresh_id(&records);
            let created_at = self.clock.now();

            let notification = match Notification::from_new(id, created_at, input) {
                Ok(notification) => notification,
                Err(err) => {
                    warn!(
                        "event=notification_create module=engine status=rejected type={} reason={}",
                        kind, err
                    );
                    return Err(err.into());
                }
            };

            records.insert(0, notification.clone());
            self.persist(&records, PersistOp::Create);
            notification
        };

        info!(
            "event=notification_create module=engine status=ok id={} type={} priority={} user_scoped={}",
            created.id,
            created.kind,
            created.priority.as_str(),
            created.target_user_id.is_some()
        );
        self.events
            .publish(&NotificationEvent::Created(created.clone()));
        Ok(created)
    }

    /// Marks one notification read. Returns whether anything changed.
    pub fn mark_read(&self, id: NotificationId) -> bool {
        let _order = self.publish_order.lock();
        let changed = {
            let mut records = self.records.write();
            let changed = records
                .iter_mut()
                .find(|record| record.id == id)
                .is_some_and(Notification::mark_read);
            if changed {
                self.persist(&records, PersistOp::MarkRead);
            }
            changed
        };

        debug!("event=notification_mark_read module=engine status=ok id={id} changed={changed}");
        if changed {
            self.events.publish(&NotificationEvent::Read { id });
        }
        changed
    }

    /// Marks every unread notification visible to `viewer` as read.
    ///
    /// Returns how many records changed. Records outside the audience are
    /// left untouched.
    pub fn mark_all_read(&self, viewer: &Viewer) -> usize {
        let _order = self.publish_order.lock();
        let ids: Vec<NotificationId> = {
            let mut records = self.records.write();
            let ids: Vec<_> = records
                .iter_mut()
                .filter(|record| record.is_visible_to(viewer))
                .filter_map(|record| record.mark_read().then_some(record.id))
                .collect();
            if !ids.is_empty() {
                self.persist(&records, PersistOp::MarkAllRead);
            }
            ids
        };

        debug!(
            "event=notification_mark_all_read module=engine status=ok role={} changed={}",
            viewer.role,
            ids.len()
        );
        let changed = ids.len();
        if changed > 0 {
            self.events.publish(&NotificationEvent::AllRead {
                viewer: viewer.clone(),
                ids,
            });
        }
        changed
    }

    /// Removes one notification. Returns whether it existed.
    pub fn delete(&self, id: NotificationId) -> bool {
        let _order = self.publish_order.lock();
        let removed = {
            let mut records = self.records.write();
            let before = records.len();
            records.retain(|record| record.id != id);
            let removed = records.len() != before;
            if removed {
                self.persist(&records, PersistOp::Delete);
            }
            removed
        };

        debug!("event=notification_delete module=engine status=ok id={id} removed={removed}");
        if removed {
            self.events.publish(&NotificationEvent::Deleted { id });
        }
        removed
    }

    /// Removes every notification for every audience.
    ///
    /// Global on purpose; portal "clear all" buttons should call
    /// `clear_all_for` instead.
    pub fn clear_all(&self) -> usize {
        let _order = self.publish_order.lock();
        let removed = {
            let mut records = self.records.write();
            let removed = records.len();
            records.clear();
            if removed > 0 {
                self.persist(&records, PersistOp::ClearAll);
            }
            removed
        };

        info!("event=notification_clear module=engine status=ok scope=global removed={removed}");
        if removed > 0 {
            self.events.publish(&NotificationEvent::Cleared {
                viewer: None,
                removed,
            });
        }
        removed
    }

    /// Removes exactly the notifications `visible_for(viewer)` would return.
    pub fn clear_all_for(&self, viewer: &Viewer) -> usize {
        let _order = self.publish_order.lock();
        let removed = {
            let mut records = self.records.write();
            let before = records.len();
            records.retain(|record| !record.is_visible_to(viewer));
            let removed = before - records.len();
            if removed > 0 {
                self.persist(&records, PersistOp::ClearAllFor);
            }
            removed
        };

        info!(
            "event=notification_clear module=engine status=ok scope=viewer role={} removed={}",
            viewer.role, removed
        );
        if removed > 0 {
            self.events.publish(&NotificationEvent::Cleared {
                viewer: Some(viewer.clone()),
                removed,
            });
        }
        removed
    }

    /// Notifications addressed to `viewer`, newest first.
    pub fn visible_for(&self, viewer: &Viewer) -> Vec<Notification> {
        targeting::visible_for(&self.records.read(), viewer)
    }

    /// First `limit` entries of `visible_for`.
    pub fn recent_for(&self, viewer: &Viewer, limit: usize) -> Vec<Notification> {
        let mut visible = self.visible_for(viewer);
        visible.truncate(limit);
        visible
    }

    /// `visible_for` narrowed to one notification type.
    pub fn visible_of_type(&self, viewer: &Viewer, kind: NotificationType) -> Vec<Notification> {
        targeting::visible_of_type(&self.records.read(), viewer, kind)
    }

    /// Unread notifications addressed to `viewer`.
    pub fn unread_count_for(&self, viewer: &Viewer) -> usize {
        targeting::unread_count_for(&self.records.read(), viewer)
    }

    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.records
            .read()
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Total stored notifications across all audiences.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// True when the store failed to load and saves are being skipped.
    pub fn writes_suspended(&self) -> bool {
        self.suspended_writes.is_some()
    }

    fn persist(&self, records: &[Notification], op: PersistOp) {
        if let Some(reason) = &self.suspended_writes {
            let err = RepoError::WritesSuspended(reason.clone());
            self.monitor.on_persistence_error(op, self.repo.medium(), &err);
            return;
        }
        let started_at = Instant::now();
        match self.repo.save_all(records) {
            Ok(()) => debug!(
                "event=persist module=engine status=ok op={} medium={} records={} duration_ms={}",
                op.as_str(),
                self.repo.medium(),
                records.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => self
                .monitor
                .on_persistence_error(op, self.repo.medium(), &err),
        }
    }
}

fn fresh_id(records: &[Notification]) -> NotificationId {
    loop {
        let candidate = Uuid::new_v4();
        if !records.iter().any(|record| record.id == candidate) {
            return candidate;
        }
    }
}
