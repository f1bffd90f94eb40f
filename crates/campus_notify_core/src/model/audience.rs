//! Audience targeting shape.
//!
//! # Responsibility
//! - Represent the role set a notification is addressed to.
//! - Provide the single inclusion rule shared by every read and bulk write.
//!
//! # Invariants
//! - `TargetRoles::Roles` is never empty and never contains blank entries.
//! - The `all` sentinel collapses any role list into `TargetRoles::All`.

use crate::model::notification::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;

/// Sentinel role id meaning "every role".
pub const ALL_ROLES: &str = "all";

/// Role vocabulary used by the school portals.
pub const ROLE_STUDENT: &str = "student";
pub const ROLE_TEACHER: &str = "teacher";
pub const ROLE_SCHOOL_ADMINISTRATOR: &str = "school_administrator";
pub const ROLE_MANAGER: &str = "manager";

/// Roles a notification is addressed to.
///
/// Serialized as a plain string list (`["teacher"]`, or `["all"]`) to keep
/// the stored layout identical to what portal clients already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRoles {
    All,
    Roles(BTreeSet<String>),
}

impl TargetRoles {
    /// Builds a validated role set from caller input.
    ///
    /// # Errors
    /// - `EmptyTargetRoles` when no role is given.
    /// - `BlankRole` when one entry is whitespace only.
    pub fn from_roles<I, S>(roles: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = BTreeSet::new();
        for role in roles {
            let role = role.as_ref().trim();
            if role.is_empty() {
                return Err(ValidationError::BlankRole);
            }
            normalized.insert(role.to_string());
        }

        if normalized.is_empty() {
            return Err(ValidationError::EmptyTargetRoles);
        }
        // Every entry is checked before the sentinel collapses the set.
        if normalized.contains(ALL_ROLES) {
            return Ok(Self::All);
        }
        Ok(Self::Roles(normalized))
    }

    /// Convenience constructor for one role.
    pub fn single(role: impl AsRef<str>) -> Result<Self, ValidationError> {
        Self::from_roles([role])
    }

    pub fn includes_role(&self, role: &str) -> bool {
        match self {
            Self::All => true,
            Self::Roles(roles) => roles.contains(role),
        }
    }

    /// Returns wire values in stable sorted order.
    pub fn to_wire(&self) -> Vec<String> {
        match self {
            Self::All => vec![ALL_ROLES.to_string()],
            Self::Roles(roles) => roles.iter().cloned().collect(),
        }
    }
}

impl Serialize for TargetRoles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TargetRoles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        Self::from_roles(raw).map_err(serde::de::Error::custom)
    }
}

/// The (role, optional user) pair a consumer reads or mutates as.
///
/// Supplied verbatim by the host session provider; no authentication
/// happens here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Viewer {
    pub role: String,
    pub user_id: Option<String>,
}

impl Viewer {
    pub fn new(role: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            role: role.into(),
            user_id,
        }
    }

    /// Viewer identified by role only. User-scoped records stay hidden.
    pub fn role_only(role: impl Into<String>) -> Self {
        Self::new(role, None)
    }

    pub fn user(role: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::new(role, Some(user_id.into()))
    }
}

/// Inclusion rule for one record.
///
/// A record matches when its roles include `viewer.role` (or are `all`) and
/// it is either not user-scoped or scoped to exactly `viewer.user_id`.
pub fn is_addressed_to(
    target_roles: &TargetRoles,
    target_user_id: Option<&str>,
    viewer: &Viewer,
) -> bool {
    if !target_roles.includes_role(viewer.role.as_str()) {
        return false;
    }
    match target_user_id {
        None => true,
        Some(target) => viewer.user_id.as_deref() == Some(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_roles_rejects_empty_input() {
        let err = TargetRoles::from_roles(Vec::<String>::new()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyTargetRoles);
    }

    #[test]
    fn from_roles_rejects_blank_entry() {
        let err = TargetRoles::from_roles(["teacher", "  "]).unwrap_err();
        assert_eq!(err, ValidationError::BlankRole);
    }

    #[test]
    fn all_sentinel_wins_over_named_roles() {
        let roles = TargetRoles::from_roles(["teacher", "all"]).unwrap();
        assert_eq!(roles, TargetRoles::All);
        assert!(roles.includes_role("manager"));
    }

    #[test]
    fn blank_entry_is_rejected_wherever_the_sentinel_appears() {
        for roles in [["all", " "], [" ", "all"]] {
            assert_eq!(
                TargetRoles::from_roles(roles).unwrap_err(),
                ValidationError::BlankRole,
                "{roles:?}"
            );
        }
    }

    #[test]
    fn roles_are_trimmed_and_deduplicated() {
        let roles = TargetRoles::from_roles([" student", "student ", "teacher"]).unwrap();
        assert_eq!(roles.to_wire(), vec!["student", "teacher"]);
    }

    #[test]
    fn user_scoped_record_needs_exact_user() {
        let roles = TargetRoles::single(ROLE_STUDENT).unwrap();
        assert!(is_addressed_to(&roles, Some("bob"), &Viewer::user("student", "bob")));
        assert!(!is_addressed_to(&roles, Some("bob"), &Viewer::user("student", "alice")));
        assert!(!is_addressed_to(&roles, Some("bob"), &Viewer::role_only("student")));
        assert!(!is_addressed_to(&roles, Some("bob"), &Viewer::user("teacher", "bob")));
    }

    #[test]
    fn deserialize_rejects_empty_role_list() {
        let err = serde_json::from_str::<TargetRoles>("[]").unwrap_err();
        assert!(err.to_string().contains("target roles"));
    }
}
