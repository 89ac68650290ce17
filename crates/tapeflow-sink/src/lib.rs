//! The signal-sink boundary.
//!
//! Downstream consumers (dashboards, stores) are best-effort: a slow or
//! failing consumer never blocks or backpressures the analysis path. The
//! bounded broadcast channel drops the oldest queued items for lagging
//! receivers; drops are counted, never propagated.

pub mod error;
pub mod queue;

pub use error::{SinkError, SinkResult};
pub use queue::{SignalSink, SinkEvent, SinkSubscriber};
