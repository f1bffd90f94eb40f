//! Core use-case services.
//!
//! # Responsibility
//! - Own the authoritative notification set and serialize every mutation.
//! - Keep portal/CLI layers decoupled from storage and presentation details.

pub mod notification_engine;
pub mod producers;
