//! Daily score computation.
//!
//! score = wake-up points + consistency points + sleep-duration points
//!         - shame deductions, clamped to `0..=MAX_DAILY_SCORE`.

use crate::config::GameConfig;

pub const MAX_DAILY_SCORE: i64 = 100;
pub const MAX_WAKE_UP_POINTS: i64 = 40;
pub const MAX_CONSISTENCY_POINTS: i64 = 30;

/// One wake-up point is lost for every started block of this many minutes late.
const LATE_MINUTES_PER_POINT: i64 = 3;
const CONSISTENCY_POINTS_PER_STREAK_DAY: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub wake_up_points: i64,
    pub consistency_points: i64,
    pub sleep_duration_points: i64,
    pub shame_count: i64,
    pub shame_deductions: i64,
    pub score: i64,
}

/// Punctuality points. `minutes_late <= 0` means on time or early.
pub fn wake_up_points(minutes_late: i64) -> i64 {
    if minutes_late <= 0 {
        return MAX_WAKE_UP_POINTS;
    }
    let lost = (minutes_late + LATE_MINUTES_PER_POINT - 1) / LATE_MINUTES_PER_POINT;
    (MAX_WAKE_UP_POINTS - lost).max(0)
}

pub fn consistency_points(streak: i64) -> i64 {
    (streak.max(0) * CONSISTENCY_POINTS_PER_STREAK_DAY).min(MAX_CONSISTENCY_POINTS)
}

/// Streak after a wake-up, given whether the previous local day was logged.
pub fn next_streak(current_streak: i64, logged_previous_day: bool) -> i64 {
    if logged_previous_day {
        current_streak.max(0) + 1
    } else {
        1
    }
}

/// Streak as it stands on a given day. It lapses once neither that day nor
/// the one before has a logged wake-up.
pub fn streak_as_of(stored_streak: i64, logged_today: bool, logged_yesterday: bool) -> i64 {
    if logged_today || logged_yesterday {
        stored_streak.max(0)
    } else {
        0
    }
}

fn total(parts: i64, deductions: i64) -> i64 {
    parts.saturating_sub(deductions).clamp(0, MAX_DAILY_SCORE)
}

pub fn compute_daily_score(
    minutes_late: i64,
    streak: i64,
    shame_count: i64,
    config: &GameConfig,
) -> ScoreBreakdown {
    let wake_up_points = wake_up_points(minutes_late);
    let consistency_points = consistency_points(streak);
    let sleep_duration_points = config.sleep_duration_bonus;
    let shame_count = shame_count.max(0);
    let shame_deductions = shame_count.saturating_mul(config.shame_penalty);

    ScoreBreakdown {
        wake_up_points,
        consistency_points,
        sleep_duration_points,
        shame_count,
        shame_deductions,
        score: total(
            wake_up_points + consistency_points + sleep_duration_points,
            shame_deductions,
        ),
    }
}

/// Applies one more shame to an existing breakdown.
pub fn apply_shame(current: &ScoreBreakdown, config: &GameConfig) -> ScoreBreakdown {
    let shame_count = current.shame_count.saturating_add(1);
    let shame_deductions = current.shame_deductions.saturating_add(config.shame_penalty);
    ScoreBreakdown {
        shame_count,
        shame_deductions,
        score: total(
            current.wake_up_points + current.consistency_points + current.sleep_duration_points,
            shame_deductions,
        ),
        ..*current
    }
}
