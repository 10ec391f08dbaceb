//! Shame Game rules.
//!
//! Pure functions only: challenge generation, daily scoring, per-user
//! calendar math, the friend-request state machine and feed text.
//! Persistence lives in shame-db, orchestration in shame-api.

pub mod challenge;
pub mod config;
pub mod error;
pub mod feed;
pub mod friendship;
pub mod schedule;
pub mod scoring;

pub use config::GameConfig;
pub use error::EngineError;
