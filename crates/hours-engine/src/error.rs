//! Error types for hours-engine operations.
//!
//! Parsing and evaluation never fail. These errors surface from the holiday
//! lookup plumbing, where the oracle boundary turns them into an empty
//! holiday set, and from resolving timezone names.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HoursError {
    #[error("Holiday fetch failed: {0}")]
    HolidayFetch(String),

    #[error("Invalid holiday payload: {0}")]
    HolidayPayload(String),

    #[error("Holiday cache I/O: {0}")]
    CacheIo(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

pub type Result<T> = std::result::Result<T, HoursError>;
