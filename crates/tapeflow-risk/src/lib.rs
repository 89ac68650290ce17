//! Risk gating for new entries.
//!
//! Owns the daily limits and the one-way drawdown circuit breaker. Every
//! refusal is a normal, expected outcome: callers check the boolean and
//! skip the action.

pub mod breaker;
pub mod config;
pub mod controller;
pub mod error;

pub use breaker::{BreakerLatch, BreakerReason};
pub use config::RiskConfig;
pub use controller::RiskController;
pub use error::{RiskError, RiskResult};
