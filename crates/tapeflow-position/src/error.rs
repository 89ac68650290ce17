//! Position error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Position already open for {0}")]
    AlreadyOpen(String),

    #[error("No open position for {0}")]
    NotOpen(String),
}

pub type PositionResult<T> = Result<T, PositionError>;
