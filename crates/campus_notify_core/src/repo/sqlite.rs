//! SQLite snapshot repository.
//!
//! # Responsibility
//! - Persist the notification set into the `notifications` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `save_all` replaces every row inside one transaction.
//! - `position` preserves the engine's storage order across restarts.
//! - Rows that fail to parse are dropped on load, never surfaced as errors.

use crate::db::{open_db, open_db_in_memory};
use crate::model::audience::TargetRoles;
use crate::model::notification::{Metadata, Notification, NotificationType, Priority};
use crate::repo::snapshot::retain_valid;
use crate::repo::{NotificationRepository, RepoResult};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use uuid::Uuid;

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    id,
    type,
    title,
    message,
    priority,
    is_read,
    created_at,
    target_roles,
    target_user_id,
    action_url,
    metadata
FROM notifications
ORDER BY position ASC";

const NOTIFICATION_INSERT_SQL: &str = "INSERT INTO notifications (
    id,
    position,
    type,
    title,
    message,
    priority,
    is_read,
    created_at,
    target_roles,
    target_user_id,
    action_url,
    metadata
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);";

/// SQLite-backed notification repository.
pub struct SqliteNotificationRepository {
    conn: Mutex<Connection>,
}

impl SqliteNotificationRepository {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a migrated in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl NotificationRepository for SqliteNotificationRepository {
    fn medium(&self) -> &'static str {
        "sqlite"
    }

    fn load_all(&self) -> RepoResult<Vec<Notification>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(NOTIFICATION_SELECT_SQL)?;
        let mut rows = stmt.query([])?;

        let mut candidates = Vec::new();
        let mut index = 0usize;
        while let Some(row) = rows.next()? {
            candidates.push((index, parse_notification_row(row)));
            index += 1;
        }

        Ok(retain_valid(candidates))
    }

    fn save_all(&self, notifications: &[Notification]) -> RepoResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM notifications;", [])?;
        {
            let mut insert = tx.prepare(NOTIFICATION_INSERT_SQL)?;
            for (position, notification) in notifications.iter().enumerate() {
                let target_roles = serde_json::to_string(&notification.target_roles)
                    .map_err(crate::repo::RepoError::Encode)?;
                let metadata = notification
                    .metadata
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()
                    .map_err(crate::repo::RepoError::Encode)?;

                insert.execute(params![
                    notification.id.to_string(),
                    i64::try_from(position).unwrap_or(i64::MAX),
                    notification.kind.as_str(),
                    notification.title.as_str(),
                    notification.message.as_str(),
                    notification.priority.as_str(),
                    bool_to_int(notification.read),
                    notification
                        .created_at
                        .to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    target_roles,
                    notification.target_user_id.as_deref(),
                    notification.action_url.as_deref(),
                    metadata,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_notification_row(row: &Row<'_>) -> Result<Notification, String> {
    let column = |name: &str, err: rusqlite::Error| format!("column `{name}`: {err}");

    let id_text: String = row.get("id").map_err(|err| column("id", err))?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| format!("invalid uuid value `{id_text}` in notifications.id"))?;

    let type_text: String = row.get("type").map_err(|err| column("type", err))?;
    let kind = NotificationType::parse(&type_text)
        .ok_or_else(|| format!("invalid notification type `{type_text}`"))?;

    let priority_text: String = row.get("priority").map_err(|err| column("priority", err))?;
    let priority = Priority::parse(&priority_text)
        .ok_or_else(|| format!("invalid priority `{priority_text}`"))?;

    let read = match row.get::<_, i64>("is_read").map_err(|err| column("is_read", err))? {
        0 => false,
        1 => true,
        other => return Err(format!("invalid is_read value `{other}`")),
    };

    let created_text: String = row
        .get("created_at")
        .map_err(|err| column("created_at", err))?;
    let created_at = DateTime::parse_from_rfc3339(&created_text)
        .map_err(|err| format!("invalid created_at `{created_text}`: {err}"))?
        .with_timezone(&Utc);

    let roles_text: String = row
        .get("target_roles")
        .map_err(|err| column("target_roles", err))?;
    let target_roles: TargetRoles = serde_json::from_str(&roles_text)
        .map_err(|err| format!("invalid target_roles `{roles_text}`: {err}"))?;

    let metadata = match row
        .get::<_, Option<String>>("metadata")
        .map_err(|err| column("metadata", err))?
    {
        Some(text) => Some(
            serde_json::from_str::<Metadata>(&text)
                .map_err(|err| format!("invalid metadata: {err}"))?,
        ),
        None => None,
    };

    Ok(Notification {
        id,
        kind,
        title: row.get("title").map_err(|err| column("title", err))?,
        message: row.get("message").map_err(|err| column("message", err))?,
        priority,
        read,
        created_at,
        target_roles,
        target_user_id: row
            .get("target_user_id")
            .map_err(|err| column("target_user_id", err))?,
        action_url: row
            .get("action_url")
            .map_err(|err| column("action_url", err))?,
        metadata,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::notification::NewNotification;

    fn record(title: &str) -> Notification {
        let input = NewNotification::new(NotificationType::ExamGraded, title, "score posted")
            .to_roles(["student"])
            .to_user("s-1")
            .priority(Priority::High);
        Notification::from_new(Uuid::new_v4(), Utc::now(), input).unwrap()
    }

    #[test]
    fn save_then_load_preserves_order_and_fields() {
        let repo = SqliteNotificationRepository::open_in_memory().unwrap();
        let mut first = record("first");
        first.read = true;
        let second = record("second");

        repo.save_all(&[second.clone(), first.clone()]).unwrap();
        assert_eq!(repo.load_all().unwrap(), vec![second, first]);
    }

    #[test]
    fn save_replaces_previous_rows() {
        let repo = SqliteNotificationRepository::open_in_memory().unwrap();
        repo.save_all(&[record("a"), record("b")]).unwrap();
        repo.save_all(&[]).unwrap();
        assert!(repo.load_all().unwrap().is_empty());
    }

    #[test]
    fn unparsable_rows_are_dropped_on_load() {
        let repo = SqliteNotificationRepository::open_in_memory().unwrap();
        let good = record("good");
        repo.save_all(&[good.clone()]).unwrap();
        repo.conn
            .lock()
            .execute(
                "INSERT INTO notifications (id, position, type, title, message, priority, is_read, created_at, target_roles)
                 VALUES ('bad', 1, 'exam_lost', 't', 'm', 'normal', 0, 'yesterday', '[]');",
                [],
            )
            .unwrap();

        assert_eq!(repo.load_all().unwrap(), vec![good]);
    }
}
