//! Engine wiring for the tapeflow pipeline.
//!
//! Assembles the merge, flow, position, risk, and sink layers into one
//! running deployment: per-instrument single-writer analyzer tasks fed
//! from a synchronous merge path, plus configuration loading and
//! versioned state snapshots.

pub mod config;
pub mod engine;
pub mod error;
pub mod snapshot;

pub use config::{EngineConfig, SubscriptionConfig};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use snapshot::{EngineSnapshot, InstrumentSnapshot, SNAPSHOT_VERSION};
