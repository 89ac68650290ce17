//! Per-instrument feed merge and canonical tick emission.
//!
//! One exclusive critical section per instrument: unrelated instruments
//! proceed independently under their own locks. The merge path performs no
//! I/O and never awaits.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use tapeflow_core::{CanonicalTick, FeedSource, Instrument, Interval, Price, RawFeedEvent};
use tapeflow_telemetry::metrics::{
    MALFORMED_EVENTS_TOTAL, TICKS_EMITTED_TOTAL, TICKS_THROTTLED_TOTAL, VOLUME_RESETS_TOTAL,
};

use crate::interval::{DeltaDecision, IntervalVolumeState};

/// Reconciler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Minimum spacing between near-duplicate emissions (ms).
    ///
    /// Only suppresses emissions with `volume_delta == 0` and an unchanged
    /// price; emissions that carry new volume or a new price are never
    /// throttled. Set to 0 to disable.
    #[serde(default = "default_min_emit_spacing_ms")]
    pub min_emit_spacing_ms: i64,
}

fn default_min_emit_spacing_ms() -> i64 {
    250
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            min_emit_spacing_ms: default_min_emit_spacing_ms(),
        }
    }
}

/// The last emission for an instrument, used by the throttle.
#[derive(Debug, Clone, Copy)]
struct LastEmit {
    ts_ms: i64,
    price: Price,
    volume_delta: u64,
}

/// Merge state for one instrument. Guarded by the instrument's mutex.
#[derive(Debug, Default)]
struct InstrumentMergeState {
    /// Intervals with at least one active subscriber.
    subscribed: BTreeSet<Interval>,
    /// The finest subscribed interval; the only one allowed to emit volume.
    primary: Option<Interval>,
    /// Volume trackers per interval, kept warm even when non-primary.
    trackers: HashMap<Interval, IntervalVolumeState>,
    /// Most recent price across all sources (latest-timestamp-wins).
    last_price: Option<(Price, i64)>,
    last_emit: Option<LastEmit>,
}

impl InstrumentMergeState {
    /// Recompute the primary interval after a subscription change.
    ///
    /// On hand-off the new primary's baseline is cleared so its next
    /// observation is treated as a first one, even if the tracker held
    /// stale state from its non-primary days.
    fn recompute_primary(&mut self) -> Option<Interval> {
        let new_primary = self.subscribed.iter().next().copied();
        if new_primary != self.primary {
            if let Some(p) = new_primary {
                if let Some(tracker) = self.trackers.get_mut(&p) {
                    tracker.clear_baseline();
                }
            }
            self.primary = new_primary;
        }
        new_primary
    }

    /// Merge a price observation: latest timestamp wins across sources.
    fn merge_price(&mut self, price: Price, ts_ms: i64) {
        match self.last_price {
            Some((_, last_ts)) if ts_ms < last_ts => {}
            _ => self.last_price = Some((price, ts_ms)),
        }
    }
}

/// Merges normalized events from heterogeneous upstream feeds into a
/// de-duplicated, monotonically-consistent canonical tick stream.
pub struct VolumeReconciler {
    config: MergeConfig,
    instruments: DashMap<Instrument, Arc<Mutex<InstrumentMergeState>>>,
}

impl VolumeReconciler {
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            instruments: DashMap::new(),
        }
    }

    fn entry(&self, instrument: &Instrument) -> Arc<Mutex<InstrumentMergeState>> {
        self.instruments
            .entry(instrument.clone())
            .or_insert_with(|| Arc::new(Mutex::new(InstrumentMergeState::default())))
            .clone()
    }

    /// Register an active subscriber for `(instrument, interval)`.
    ///
    /// The numerically smallest subscribed interval becomes primary.
    pub fn subscribe(&self, instrument: &Instrument, interval: Interval) {
        let entry = self.entry(instrument);
        let mut state = entry.lock();
        state.subscribed.insert(interval);
        let primary = state.recompute_primary();
        debug!(%instrument, %interval, primary = ?primary, "interval subscribed");
    }

    /// Remove the subscriber for `(instrument, interval)`.
    ///
    /// If the primary interval changes, the new primary tracker is
    /// re-baselined (cold-start rule applies to its next observation).
    pub fn unsubscribe(&self, instrument: &Instrument, interval: Interval) {
        let entry = self.entry(instrument);
        let mut state = entry.lock();
        state.subscribed.remove(&interval);
        let primary = state.recompute_primary();
        debug!(%instrument, %interval, primary = ?primary, "interval unsubscribed");
    }

    /// Invalidate volume baselines for a disconnected source.
    ///
    /// Subscription sets and primary-interval selection are left intact;
    /// only trackers last fed by `source` forget their baseline, so the
    /// first observation after reconnect follows the cold-start rule.
    pub fn invalidate_source(&self, source: &FeedSource) {
        for entry in self.instruments.iter() {
            let mut state = entry.value().lock();
            for tracker in state.trackers.values_mut() {
                if tracker.last_source.as_ref() == Some(source) {
                    tracker.clear_baseline();
                }
            }
        }
        debug!(%source, "volume baselines invalidated for source");
    }

    /// Process one raw feed event; returns a canonical tick if this event
    /// produced an accepted merge decision.
    ///
    /// Malformed events are dropped with no state mutation. Non-primary
    /// interval updates warm their tracker but never emit.
    pub fn record(&self, event: &RawFeedEvent) -> Option<CanonicalTick> {
        if let Err(e) = event.validate() {
            MALFORMED_EVENTS_TOTAL
                .with_label_values(&[event.instrument.as_str(), event.source.as_str()])
                .inc();
            debug!(instrument = %event.instrument, source = %event.source, error = %e,
                "malformed event dropped");
            return None;
        }

        let entry = self.entry(&event.instrument);
        let mut state = entry.lock();

        state.merge_price(event.price, event.ts_ms);

        let decision = if let Some(cumulative) = event.cumulative_volume {
            let tracker = state
                .trackers
                .entry(event.interval)
                .or_insert_with(|| IntervalVolumeState::new(event.interval));
            Some(tracker.observe(cumulative, event.ts_ms, &event.source))
        } else {
            None
        };

        // Primary-interval exclusivity: only the finest subscribed interval
        // may emit, so the same underlying trade volume is never counted
        // under two aggregation granularities.
        if state.primary != Some(event.interval) {
            trace!(instrument = %event.instrument, interval = %event.interval,
                "non-primary update absorbed");
            return None;
        }

        let volume_delta = match decision {
            Some(DeltaDecision::Reset) => {
                VOLUME_RESETS_TOTAL
                    .with_label_values(&[
                        event.instrument.as_str(),
                        &event.interval.to_string(),
                    ])
                    .inc();
                warn!(instrument = %event.instrument, interval = %event.interval,
                    "cumulative volume regression, baseline reset");
                1
            }
            Some(d) => d.volume_delta(),
            // Price-only primary source carries no volume field.
            None => 0,
        };

        let (price, _) = state.last_price?;

        if self.is_throttled(&state, price, volume_delta, event.ts_ms) {
            TICKS_THROTTLED_TOTAL
                .with_label_values(&[event.instrument.as_str()])
                .inc();
            trace!(instrument = %event.instrument, "duplicate emission throttled");
            return None;
        }

        state.last_emit = Some(LastEmit {
            ts_ms: event.ts_ms,
            price,
            volume_delta,
        });
        TICKS_EMITTED_TOTAL
            .with_label_values(&[event.instrument.as_str()])
            .inc();

        Some(CanonicalTick {
            instrument: event.instrument.clone(),
            ts_ms: event.ts_ms,
            last_price: price,
            volume_delta,
            source: event.source.clone(),
            interval: event.interval,
        })
    }

    /// An emission is suppressed only when it is a pure duplicate: zero
    /// volume delta, unchanged price, and inside the spacing window.
    /// Anything carrying new volume or a new price always goes out.
    fn is_throttled(
        &self,
        state: &InstrumentMergeState,
        price: Price,
        volume_delta: u64,
        ts_ms: i64,
    ) -> bool {
        if self.config.min_emit_spacing_ms == 0 || volume_delta != 0 {
            return false;
        }
        match state.last_emit {
            Some(last) => {
                price == last.price
                    && last.volume_delta == 0
                    && ts_ms - last.ts_ms < self.config.min_emit_spacing_ms
            }
            None => false,
        }
    }

    /// Export volume tracker states for an instrument (for snapshots).
    pub fn export_trackers(&self, instrument: &Instrument) -> Vec<IntervalVolumeState> {
        self.instruments
            .get(instrument)
            .map(|entry| entry.lock().trackers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Restore volume tracker states for an instrument (from a snapshot).
    pub fn restore_trackers(&self, instrument: &Instrument, trackers: Vec<IntervalVolumeState>) {
        let entry = self.entry(instrument);
        let mut state = entry.lock();
        for tracker in trackers {
            state.trackers.insert(tracker.interval, tracker);
        }
    }
}

impl Default for VolumeReconciler {
    fn default() -> Self {
        Self::new(MergeConfig::default())
    }
}
