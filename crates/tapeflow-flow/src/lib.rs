//! Order-flow analysis.
//!
//! Converts the canonical tick stream for one instrument into
//! aggressor-classified footprint statistics and drives the position
//! entry/exit state machine.

pub mod analyzer;
pub mod entry;
pub mod error;
pub mod exit;

pub use analyzer::{FlowConfig, OrderFlowAnalyzer};
pub use entry::{DeltaImbalanceDetector, EntryDetector, EntryRequest, NoEntry};
pub use exit::{
    CompositeExit, ExitDecision, ExitPolicy, FixedTargetExit, TimeStopExit, TrailingStopExit,
};
