//! Notification engine for the school portals.
//! This crate is the single source of truth for notification invariants:
//! audience targeting, read state, snapshot persistence and toast dispatch.

pub mod clock;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod logging;
pub mod model;
pub mod presentation;
pub mod repo;
pub mod service;
pub mod targeting;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, EngineConfig, LoggingConfig, StorageConfig, ToastConfig};
pub use dispatch::{
    DispatchError, EventBus, LogToastSink, NotificationEvent, NotificationSubscriber, Toast,
    ToastAnnouncer, ToastPolicy, ToastSink,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::audience::{TargetRoles, Viewer, ALL_ROLES};
pub use model::notification::{
    Metadata, NewNotification, Notification, NotificationId, NotificationType, Priority,
    ValidationError,
};
pub use repo::{
    open_repository, InMemoryNotificationRepository, JsonFileNotificationRepository,
    NotificationRepository, RepoError, RepoResult, SqliteNotificationRepository,
};
pub use service::notification_engine::{
    EngineBuilder, EngineError, EngineResult, LoggingPersistenceMonitor, NotificationEngine,
    PersistOp, PersistenceMonitor,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
