//! Time-of-day goals, per-user calendar days and the shame window.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::error::EngineError;

pub const MIN_UTC_OFFSET_MINUTES: i32 = -12 * 60;
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Friends become shameable this long after their wake-up goal.
pub const SHAME_GRACE_MINUTES: i64 = 30;

const TIME_FORMATS: &[&str] = &["%I:%M %p", "%I:%M%p", "%H:%M"];

/// Parses goals such as "7:00 AM", "7:00am" or "07:00".
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime, EngineError> {
    let trimmed = input.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| EngineError::InvalidTime(input.to_string()))
}

pub fn user_offset(minutes: i32) -> Result<FixedOffset, EngineError> {
    if !(MIN_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&minutes) {
        return Err(EngineError::InvalidOffset(minutes));
    }
    FixedOffset::east_opt(minutes * 60).ok_or(EngineError::InvalidOffset(minutes))
}

pub fn local_time(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<FixedOffset> {
    now.with_timezone(&offset)
}

pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    local_time(now, offset).date_naive()
}

/// Minutes between the goal and the actual time on the same day.
/// Negative when the user was early.
pub fn minutes_late(goal: NaiveTime, actual: NaiveTime) -> i64 {
    (actual - goal).num_minutes()
}

/// The first `days` local dates ending at `today`, newest first.
pub fn recent_dates(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..i64::from(days))
        .filter_map(|i| today.checked_sub_signed(Duration::days(i)))
        .collect()
}

/// A friend may be shamed when they haven't logged a wake-up today and
/// their local time is between goal + grace and noon.
pub fn shame_window_open(goal: NaiveTime, local_now: NaiveTime, woke_up_today: bool) -> bool {
    if woke_up_today {
        return false;
    }
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
    let (opens, wrapped) = goal.overflowing_add_signed(Duration::minutes(SHAME_GRACE_MINUTES));
    wrapped == 0 && opens <= local_now && local_now < noon
}
