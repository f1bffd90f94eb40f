//! JSON file snapshot repository.
//!
//! # Responsibility
//! - Persist the full notification set as one versioned JSON document.
//!
//! # Invariants
//! - Writes go to a sibling temp file that is renamed over the target, so a
//!   crash mid-write leaves the previous snapshot intact.
//! - A missing file loads as an empty set.

use crate::model::notification::Notification;
use crate::repo::snapshot::{decode_snapshot, encode_snapshot};
use crate::repo::{NotificationRepository, RepoError, RepoResult};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const TEMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone)]
pub struct JsonFileNotificationRepository {
    path: PathBuf,
}

impl JsonFileNotificationRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "notifications.json".into());
        name.push(".");
        name.push(TEMP_SUFFIX);
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> RepoError {
        RepoError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl NotificationRepository for JsonFileNotificationRepository {
    fn medium(&self) -> &'static str {
        "json_file"
    }

    fn load_all(&self) -> RepoResult<Vec<Notification>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(&self.path, err)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        decode_snapshot(&bytes)
    }

    fn save_all(&self, notifications: &[Notification]) -> RepoResult<()> {
        let payload = encode_snapshot(notifications)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(parent, err))?;
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path).map_err(|err| self.io_error(&temp_path, err))?;
        file.write_all(&payload)
            .and_then(|()| file.sync_all())
            .map_err(|err| self.io_error(&temp_path, err))?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|err| self.io_error(&self.path, err))
    }
}
