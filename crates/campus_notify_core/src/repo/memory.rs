//! In-memory snapshot repository.
//!
//! Used for memory-only deployments and as a test fake; contents vanish with
//! the process.

use crate::model::notification::Notification;
use crate::repo::{NotificationRepository, RepoResult};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct InMemoryNotificationRepository {
    snapshot: Mutex<Vec<Notification>>,
    saves: Mutex<u64>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the repository as if `notifications` had been saved earlier.
    pub fn with_snapshot(notifications: Vec<Notification>) -> Self {
        Self {
            snapshot: Mutex::new(notifications),
            saves: Mutex::new(0),
        }
    }

    /// Returns a copy of the last saved snapshot.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.snapshot.lock().clone()
    }

    /// Number of `save_all` calls observed.
    pub fn save_count(&self) -> u64 {
        *self.saves.lock()
    }
}

impl NotificationRepository for InMemoryNotificationRepository {
    fn medium(&self) -> &'static str {
        "memory"
    }

    fn load_all(&self) -> RepoResult<Vec<Notification>> {
        Ok(self.snapshot.lock().clone())
    }

    fn save_all(&self, notifications: &[Notification]) -> RepoResult<()> {
        *self.snapshot.lock() = notifications.to_vec();
        *self.saves.lock() += 1;
        Ok(())
    }
}
