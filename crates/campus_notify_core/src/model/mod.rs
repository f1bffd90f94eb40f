//! Notification domain model.
//!
//! # Responsibility
//! - Define the canonical notification record and its audience shape.
//! - Enforce record invariants at construction and restore boundaries.
//!
//! # Invariants
//! - Every notification is identified by a stable `NotificationId`.
//! - Deletion is a hard removal; there are no tombstones.

pub mod audience;
pub mod notification;
