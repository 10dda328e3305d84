//! Validation errors shared by the aggregator, the store and the editing state machine.

use thiserror::Error;

use crate::models::TimeUnit;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown availability status '{0}' (expected available, unavailable or maybe)")]
    UnknownStatus(String),

    #[error("malformed time-key '{0}'")]
    MalformedTimeKey(String),

    #[error("time-key '{key}' does not fit a {expected} event")]
    GranularityMismatch { key: String, expected: TimeUnit },

    #[error("unknown time unit '{0}' (expected day or hour)")]
    UnknownTimeUnit(String),

    #[error("unknown consensus rule '{0}' (expected everyone or respondents)")]
    UnknownConsensusRule(String),

    #[error("invalid color '{0}' (expected #RRGGBB)")]
    InvalidColor(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("max participants must be at least 1")]
    InvalidCapacity,
}

pub type Result<T> = std::result::Result<T, ValidationError>;
