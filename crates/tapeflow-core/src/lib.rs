//! Core domain types for the tapeflow order-flow engine.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Instrument`, `Interval`, `FeedSource`: feed identification
//! - `Price`: precision-safe price type
//! - `RawFeedEvent`, `CanonicalTick`: the merge layer's input and output
//! - `FootprintBar`, `TradeSignal`, `TradeRecord`: analyzer outputs

pub mod bar;
pub mod decimal;
pub mod error;
pub mod event;
pub mod instrument;
pub mod signal;

pub use bar::FootprintBar;
pub use decimal::Price;
pub use error::{CoreError, CoreResult};
pub use event::{CanonicalTick, RawFeedEvent};
pub use instrument::{FeedSource, Instrument, Interval};
pub use signal::{Aggressor, Side, SignalAction, TradeRecord, TradeSignal};
