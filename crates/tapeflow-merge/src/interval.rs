//! Per-(instrument, interval) cumulative-volume tracking.

use serde::{Deserialize, Serialize};
use tapeflow_core::{FeedSource, Interval};

/// Outcome of observing a cumulative-volume report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaDecision {
    /// First observation for this tracker (cold start or post-hand-off).
    /// The emitted delta is a synthetic unit of 1, never the full
    /// cumulative value.
    FirstObservation,
    /// Cumulative volume decreased: session rollover or provider
    /// reconnect. The new value becomes the baseline; emitted delta is 1.
    Reset,
    /// Normal forward progress; carries the non-negative delta.
    Delta(u64),
}

impl DeltaDecision {
    /// The volume delta this decision contributes to a canonical tick.
    pub fn volume_delta(&self) -> u64 {
        match self {
            Self::FirstObservation | Self::Reset => 1,
            Self::Delta(d) => *d,
        }
    }
}

/// Volume baseline for one (instrument, interval) tracker.
///
/// Mutated only by the reconciler under the instrument's lock. The
/// baseline is cleared on primary-interval hand-off and on source
/// invalidation so the next observation is treated as a first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalVolumeState {
    pub interval: Interval,
    #[serde(default)]
    pub last_cumulative_volume: Option<u64>,
    /// Timestamp of the last accepted observation (Unix ms).
    #[serde(default)]
    pub last_seen_ts_ms: i64,
    /// Source that last fed this tracker.
    #[serde(default)]
    pub last_source: Option<FeedSource>,
}

impl IntervalVolumeState {
    pub fn new(interval: Interval) -> Self {
        Self {
            interval,
            last_cumulative_volume: None,
            last_seen_ts_ms: 0,
            last_source: None,
        }
    }

    /// Fold one cumulative-volume observation into the tracker.
    pub fn observe(&mut self, cumulative: u64, ts_ms: i64, source: &FeedSource) -> DeltaDecision {
        self.last_seen_ts_ms = ts_ms;
        self.last_source = Some(source.clone());

        let decision = match self.last_cumulative_volume {
            None => DeltaDecision::FirstObservation,
            Some(prev) if cumulative < prev => DeltaDecision::Reset,
            Some(prev) => DeltaDecision::Delta(cumulative - prev),
        };
        self.last_cumulative_volume = Some(cumulative);
        decision
    }

    /// Forget the volume baseline; the next observation is a first one.
    ///
    /// Used on primary-interval hand-off and on source disconnect.
    pub fn clear_baseline(&mut self) {
        self.last_cumulative_volume = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> FeedSource {
        FeedSource::from("dhan")
    }

    #[test]
    fn test_first_observation_is_unit_delta() {
        let mut t = IntervalVolumeState::new(Interval::MIN_1);
        let d = t.observe(500, 1_000, &src());
        assert_eq!(d, DeltaDecision::FirstObservation);
        assert_eq!(d.volume_delta(), 1);
        assert_eq!(t.last_cumulative_volume, Some(500));
    }

    #[test]
    fn test_forward_delta() {
        let mut t = IntervalVolumeState::new(Interval::MIN_1);
        t.observe(500, 1_000, &src());
        let d = t.observe(510, 2_000, &src());
        assert_eq!(d, DeltaDecision::Delta(10));
    }

    #[test]
    fn test_regression_resets_baseline() {
        let mut t = IntervalVolumeState::new(Interval::MIN_1);
        t.observe(510, 1_000, &src());
        let d = t.observe(5, 2_000, &src());
        assert_eq!(d, DeltaDecision::Reset);
        assert_eq!(d.volume_delta(), 1);
        // Next observation is a normal delta from the new baseline.
        assert_eq!(t.observe(12, 3_000, &src()), DeltaDecision::Delta(7));
    }

    #[test]
    fn test_clear_baseline_forces_first_observation() {
        let mut t = IntervalVolumeState::new(Interval::MIN_1);
        t.observe(500, 1_000, &src());
        t.clear_baseline();
        assert_eq!(t.observe(600, 2_000, &src()), DeltaDecision::FirstObservation);
    }
}
