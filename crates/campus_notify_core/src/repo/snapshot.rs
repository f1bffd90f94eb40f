//! Snapshot envelope codec and defensive record restore.
//!
//! # Invariants
//! - Written snapshots always carry `schema_version`.
//! - A bare JSON array is read as legacy version 0.
//! - One bad record never blocks recovery of the others.

use crate::model::notification::Notification;
use crate::repo::{RepoError, RepoResult};
use log::warn;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Snapshot layout version written by this build.
pub const SNAPSHOT_SCHEMA_VERSION: u64 = 1;

const SCHEMA_VERSION_KEY: &str = "schema_version";
const NOTIFICATIONS_KEY: &str = "notifications";

#[derive(Serialize)]
struct SnapshotEnvelope<'a> {
    schema_version: u64,
    notifications: &'a [Notification],
}

/// Encodes the full set into the versioned envelope.
pub fn encode_snapshot(notifications: &[Notification]) -> RepoResult<Vec<u8>> {
    let envelope = SnapshotEnvelope {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        notifications,
    };
    serde_json::to_vec_pretty(&envelope).map_err(RepoError::Encode)
}

/// Decodes a snapshot, dropping records that fail to parse or validate.
///
/// # Errors
/// - `Decode` when the payload is not JSON at all.
/// - `UnsupportedSchemaVersion` when written by a newer build.
/// - `InvalidData` when the envelope shape itself is wrong.
pub fn decode_snapshot(bytes: &[u8]) -> RepoResult<Vec<Notification>> {
    let root: Value = serde_json::from_slice(bytes).map_err(RepoError::Decode)?;

    let raw_records = match root {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let version = match map.get(SCHEMA_VERSION_KEY) {
                None => 0,
                Some(value) => value.as_u64().ok_or_else(|| {
                    RepoError::InvalidData(format!("`{SCHEMA_VERSION_KEY}` must be an unsigned integer"))
                })?,
            };
            if version > SNAPSHOT_SCHEMA_VERSION {
                return Err(RepoError::UnsupportedSchemaVersion {
                    found: version,
                    supported: SNAPSHOT_SCHEMA_VERSION,
                });
            }
            match map.remove(NOTIFICATIONS_KEY) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(RepoError::InvalidData(format!(
                        "`{NOTIFICATIONS_KEY}` must be an array"
                    )))
                }
            }
        }
        _ => {
            return Err(RepoError::InvalidData(
                "snapshot root must be an object or an array".to_string(),
            ))
        }
    };

    let candidates = raw_records.into_iter().enumerate().map(|(index, raw)| {
        (
            index,
            serde_json::from_value::<Notification>(raw).map_err(|err| err.to_string()),
        )
    });
    Ok(retain_valid(candidates))
}

/// Keeps parsed records that pass validation and have an unseen id.
///
/// Every dropped record emits one `warn!` with its position and reason.
pub fn retain_valid<I>(candidates: I) -> Vec<Notification>
where
    I: IntoIterator<Item = (usize, Result<Notification, String>)>,
{
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for (index, candidate) in candidates {
        let record = match candidate {
            Ok(record) => record,
            Err(reason) => {
                warn!("event=snapshot_restore module=repo status=dropped index={index} reason={reason}");
                continue;
            }
        };
        if let Err(err) = record.validate() {
            warn!("event=snapshot_restore module=repo status=dropped index={index} reason={err}");
            continue;
        }
        if !seen.insert(record.id) {
            warn!(
                "event=snapshot_restore module=repo status=dropped index={index} reason=duplicate_id id={}",
                record.id
            );
            continue;
        }
        kept.push(record);
    }

    kept
}
