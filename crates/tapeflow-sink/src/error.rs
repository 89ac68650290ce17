//! Sink error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink channel closed")]
    Closed,
}

pub type SinkResult<T> = Result<T, SinkError>;
