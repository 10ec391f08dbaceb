//! Feed item text and streak achievements.

use chrono::NaiveTime;

pub const MAX_COMMENT_CHARS: usize = 280;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Achievement {
    EarlyBird,
    StreakMaster,
}

impl Achievement {
    pub fn title(self) -> &'static str {
        match self {
            Self::EarlyBird => "Early Bird",
            Self::StreakMaster => "Streak Master",
        }
    }

    pub fn streak(self) -> i64 {
        match self {
            Self::EarlyBird => 7,
            Self::StreakMaster => 15,
        }
    }
}

/// Achievement unlocked when a streak reaches exactly its threshold.
pub fn achievement_for_streak(streak: i64) -> Option<Achievement> {
    [Achievement::EarlyBird, Achievement::StreakMaster]
        .into_iter()
        .find(|a| a.streak() == streak)
}

/// "6:45 AM"
pub fn display_time(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

pub fn wake_up_message(display_name: &str, time: NaiveTime) -> String {
    format!("{display_name} woke up at {} after solving MATH! 🌅", display_time(time))
}

pub fn shame_message(target_name: &str, shamer_name: &str) -> String {
    format!("{target_name} got SHAMED by {shamer_name}. Still sleeping? 😴")
}

pub fn achievement_message(display_name: &str, achievement: Achievement) -> String {
    format!(
        "{display_name} unlocked {} with a {}-day wake-up streak! 🏆",
        achievement.title(),
        achievement.streak()
    )
}

/// Trims a comment and checks its length. `None` when empty or too long.
pub fn normalize_comment(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    (1..=MAX_COMMENT_CHARS).contains(&len).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn achievements_fire_once_at_threshold() {
        assert_eq!(achievement_for_streak(6), None);
        assert_eq!(achievement_for_streak(7), Some(Achievement::EarlyBird));
        assert_eq!(achievement_for_streak(8), None);
        assert_eq!(achievement_for_streak(15), Some(Achievement::StreakMaster));
    }

    #[test]
    fn messages() {
        let t = NaiveTime::from_hms_opt(6, 45, 0).unwrap();
        assert_eq!(
            wake_up_message("Alice", t),
            "Alice woke up at 6:45 AM after solving MATH! 🌅"
        );
        assert_eq!(
            shame_message("Bob", "Alice"),
            "Bob got SHAMED by Alice. Still sleeping? 😴"
        );
    }

    #[test]
    fn comment_bounds() {
        assert_eq!(normalize_comment("  nice  "), Some("nice"));
        assert_eq!(normalize_comment("   "), None);
        assert!(normalize_comment(&"x".repeat(MAX_COMMENT_CHARS)).is_some());
        assert!(normalize_comment(&"x".repeat(MAX_COMMENT_CHARS + 1)).is_none());
    }
}
