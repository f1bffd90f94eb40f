//! Audience resolution over a notification snapshot.
//!
//! # Responsibility
//! - Answer "what does this viewer see" and "how many are unread" from the
//!   authoritative record set.
//!
//! # Invariants
//! - Results are ordered by `created_at DESC`; ties keep storage order, and
//!   storage order is newest insertion first.
//! - Unread counts are recomputed from the records on every call; there is
//!   no cached counter to drift.

use crate::model::audience::Viewer;
use crate::model::notification::{Notification, NotificationType};

/// Returns the records addressed to `viewer`, newest first.
pub fn visible_for(records: &[Notification], viewer: &Viewer) -> Vec<Notification> {
    let mut visible: Vec<Notification> = records
        .iter()
        .filter(|record| record.is_visible_to(viewer))
        .cloned()
        .collect();
    sort_newest_first(&mut visible);
    visible
}

/// Same as `visible_for`, narrowed to one notification type.
pub fn visible_of_type(
    records: &[Notification],
    viewer: &Viewer,
    kind: NotificationType,
) -> Vec<Notification> {
    let mut visible: Vec<Notification> = records
        .iter()
        .filter(|record| record.kind == kind && record.is_visible_to(viewer))
        .cloned()
        .collect();
    sort_newest_first(&mut visible);
    visible
}

/// Counts unread records addressed to `viewer`.
pub fn unread_count_for(records: &[Notification], viewer: &Viewer) -> usize {
    records
        .iter()
        .filter(|record| record.is_unread_for(viewer))
        .count()
}

/// Stable sort by `created_at DESC`.
pub fn sort_newest_first(records: &mut [Notification]) {
    records.sort_by(|left, right| right.created_at.cmp(&left.created_at));
}
