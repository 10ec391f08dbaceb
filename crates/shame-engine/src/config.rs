use crate::error::EngineError;
use crate::scoring::{MAX_CONSISTENCY_POINTS, MAX_DAILY_SCORE, MAX_WAKE_UP_POINTS};

/// Tunables for challenges, scoring and the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Inclusive lower bound for challenge operands.
    pub operand_min: i64,
    /// Inclusive upper bound for challenge operands.
    pub operand_max: i64,
    /// Points taken off a daily score per shame.
    pub shame_penalty: i64,
    /// Flat bonus granted on every successful wake-up.
    pub sleep_duration_bonus: i64,
    /// Maximum number of feed items returned.
    pub feed_limit: u32,
    /// Shames allowed per target per day. `None` means unlimited.
    pub max_shames_per_day: Option<u32>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            operand_min: 25,
            operand_max: 95,
            shame_penalty: 5,
            sleep_duration_bonus: 10,
            feed_limit: 50,
            max_shames_per_day: None,
        }
    }
}

impl GameConfig {
    pub fn validate(self) -> Result<Self, EngineError> {
        if self.operand_min < 0 {
            return Err(EngineError::InvalidConfig("operand_min must be >= 0".into()));
        }
        if self.operand_min > self.operand_max {
            return Err(EngineError::InvalidConfig(format!(
                "operand range {}..={} is empty",
                self.operand_min, self.operand_max
            )));
        }
        if self.operand_max > 1_000_000 {
            return Err(EngineError::InvalidConfig("operand_max must be <= 1000000".into()));
        }
        if !(0..=MAX_DAILY_SCORE).contains(&self.shame_penalty) {
            return Err(EngineError::InvalidConfig(format!(
                "shame_penalty must be within 0..={MAX_DAILY_SCORE}"
            )));
        }
        let bonus_cap = MAX_DAILY_SCORE - MAX_WAKE_UP_POINTS - MAX_CONSISTENCY_POINTS;
        if !(0..=bonus_cap).contains(&self.sleep_duration_bonus) {
            return Err(EngineError::InvalidConfig(format!(
                "sleep_duration_bonus must be within 0..={bonus_cap}"
            )));
        }
        if self.feed_limit == 0 {
            return Err(EngineError::InvalidConfig("feed_limit must be > 0".into()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_operand_range() {
        let cfg = GameConfig {
            operand_min: 50,
            operand_max: 10,
            ..GameConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_bonus_that_could_exceed_max_score() {
        let cfg = GameConfig {
            sleep_duration_bonus: 31,
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_penalty_outside_score_range() {
        for shame_penalty in [-1, MAX_DAILY_SCORE + 1, i64::MAX] {
            let cfg = GameConfig {
                shame_penalty,
                ..GameConfig::default()
            };
            assert!(cfg.validate().is_err(), "penalty {shame_penalty}");
        }
        let cfg = GameConfig {
            shame_penalty: MAX_DAILY_SCORE,
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
