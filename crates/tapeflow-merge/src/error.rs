//! Merge error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

pub type MergeResult<T> = Result<T, MergeError>;
