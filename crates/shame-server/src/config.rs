use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

use shame_engine::{EngineError, GameConfig};

pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error(transparent)]
    Game(#[from] EngineError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub game: GameConfig,
}

impl Config {
    /// Reads the process environment. `.env` should already be loaded.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = GameConfig::default();

        let jwt_secret = lookup("SHAME_JWT_SECRET").unwrap_or_else(|| {
            warn!("SHAME_JWT_SECRET is not set, using the development secret");
            DEV_JWT_SECRET.into()
        });

        let game = GameConfig {
            operand_min: parse_or(&lookup, "CHALLENGE_OPERAND_MIN", defaults.operand_min)?,
            operand_max: parse_or(&lookup, "CHALLENGE_OPERAND_MAX", defaults.operand_max)?,
            shame_penalty: parse_or(&lookup, "SHAME_PENALTY", defaults.shame_penalty)?,
            sleep_duration_bonus: parse_or(
                &lookup,
                "SLEEP_DURATION_BONUS",
                defaults.sleep_duration_bonus,
            )?,
            feed_limit: parse_or(&lookup, "FEED_LIMIT", defaults.feed_limit)?,
            max_shames_per_day: parse_opt(&lookup, "SHAME_MAX_PER_DAY")?,
        }
        .validate()?;

        Ok(Self {
            host: lookup("SHAME_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "SHAME_PORT", 3000)?,
            db_path: PathBuf::from(lookup("SHAME_DB_PATH").unwrap_or_else(|| "shame.db".into())),
            jwt_secret,
            game,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: "SHAME_HOST",
            value: raw,
        })
    }
}

fn parse_opt<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_opt(lookup, name)?.unwrap_or(default))
}
