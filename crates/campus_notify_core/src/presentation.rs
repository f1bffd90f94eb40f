//! Display helpers derived from `created_at`.
//!
//! Pure functions of (`created_at`, `now`); callers pass the same clock the
//! engine uses so output is deterministic in tests.

use chrono::{DateTime, Datelike, Duration, Utc};

/// Relative age label used in notification lists.
///
/// Future timestamps (clock skew) read as "just now".
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);
    if elapsed < Duration::minutes(1) {
        return "just now".to_string();
    }
    if elapsed < Duration::hours(1) {
        return format!("{}m ago", elapsed.num_minutes());
    }
    if elapsed < Duration::days(1) {
        return format!("{}h ago", elapsed.num_hours());
    }
    if elapsed < Duration::days(7) {
        return format!("{}d ago", elapsed.num_days());
    }
    created_at.format("%b %-d, %Y").to_string()
}

/// Calendar bucket used to group the notification list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateGroup {
    Today,
    Yesterday,
    ThisWeek,
    Older,
}

impl DateGroup {
    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::ThisWeek => "This week",
            Self::Older => "Older",
        }
    }
}

/// Buckets by UTC calendar day relative to `now`.
pub fn date_group(created_at: DateTime<Utc>, now: DateTime<Utc>) -> DateGroup {
    let days = now
        .date_naive()
        .num_days_from_ce()
        .saturating_sub(created_at.date_naive().num_days_from_ce());
    match days {
        i32::MIN..=0 => DateGroup::Today,
        1 => DateGroup::Yesterday,
        2..=6 => DateGroup::ThisWeek,
        _ => DateGroup::Older,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn time_ago_steps_through_units() {
        let now = at(20, 12, 0);
        assert_eq!(time_ago(at(20, 11, 59), now), "1m ago");
        assert_eq!(time_ago(at(20, 12, 0), now), "just now");
        assert_eq!(time_ago(at(20, 9, 0), now), "3h ago");
        assert_eq!(time_ago(at(18, 12, 0), now), "2d ago");
        assert_eq!(time_ago(at(2, 8, 0), now), "Apr 2, 2026");
    }

    #[test]
    fn future_timestamp_reads_as_just_now() {
        assert_eq!(time_ago(at(21, 0, 0), at(20, 0, 0)), "just now");
    }

    #[test]
    fn date_group_uses_calendar_days() {
        let now = at(20, 0, 30);
        assert_eq!(date_group(at(20, 0, 0), now), DateGroup::Today);
        assert_eq!(date_group(at(19, 23, 59), now), DateGroup::Yesterday);
        assert_eq!(date_group(at(15, 10, 0), now), DateGroup::ThisWeek);
        assert_eq!(date_group(at(1, 10, 0), now), DateGroup::Older);
    }
}
