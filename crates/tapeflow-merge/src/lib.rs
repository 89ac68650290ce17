//! Feed merge and volume reconciliation.
//!
//! Arbitrates among concurrently-reporting interval/source trackers per
//! instrument and emits at most one canonical tick per accepted merge
//! decision, free of volume double-counting.

pub mod error;
pub mod interval;
pub mod reconciler;

pub use error::{MergeError, MergeResult};
pub use interval::{DeltaDecision, IntervalVolumeState};
pub use reconciler::{MergeConfig, VolumeReconciler};
