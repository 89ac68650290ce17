//! Flow error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Analyzer configuration error: {0}")]
    Config(String),
}

pub type FlowResult<T> = Result<T, FlowError>;
