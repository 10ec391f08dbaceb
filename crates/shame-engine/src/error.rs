use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid time of day: {0:?} (expected e.g. \"7:00 AM\" or \"07:00\")")]
    InvalidTime(String),

    #[error("UTC offset {0} minutes is out of range")]
    InvalidOffset(i32),

    #[error("invalid game configuration: {0}")]
    InvalidConfig(String),
}
