//! Position lifecycle management.
//!
//! Authoritative store of the single open/closed position per instrument,
//! realized PnL aggregation, and daily statistics.

pub mod error;
pub mod manager;

pub use error::{PositionError, PositionResult};
pub use manager::{DailyStats, Position, PositionManager};
