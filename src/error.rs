//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutomatonError {
    #[error("invalid rule token {token:?} in {rule:?}: {reason}")]
    RuleParse {
        rule: String,
        token: String,
        reason: String,
    },

    #[error("grid needs {words} words ({bytes} bytes), over the {limit} byte buffer limit")]
    Allocation { words: u64, bytes: u64, limit: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed configuration: {0}")]
    ConfigFormat(String),

    #[error("a step is already in progress")]
    StepInProgress,

    #[error("arena exhausted: requested {requested}, only {available} available")]
    ArenaExhausted { requested: usize, available: usize },

    #[error("refusing to allocate an empty arena slot")]
    EmptyAllocation,
}

pub type Result<T> = std::result::Result<T, AutomatonError>;
