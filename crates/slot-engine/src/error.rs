//! Error types for slot-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlotError {
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Empty range: {0}")]
    EmptyRange(String),

    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),

    #[error("Invalid chunk request: {0}")]
    InvalidRequest(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, SlotError>;
