//! Prometheus metrics for the tapeflow engine.
//!
//! Every degrade-and-continue path in the pipeline is counted here:
//! - malformed events dropped at ingestion
//! - canonical ticks emitted / throttled
//! - risk refusals and breaker state
//! - sink drops
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_gauge, CounterVec, IntGauge,
};

/// Malformed feed events dropped at the ingestion boundary.
pub static MALFORMED_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tapeflow_malformed_events_total",
        "Malformed feed events dropped without state mutation",
        &["instrument", "source"]
    )
    .unwrap()
});

/// Canonical ticks emitted by the volume reconciler.
pub static TICKS_EMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tapeflow_ticks_emitted_total",
        "Canonical ticks emitted per instrument",
        &["instrument"]
    )
    .unwrap()
});

/// Duplicate emissions suppressed by the re-emission throttle.
pub static TICKS_THROTTLED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tapeflow_ticks_throttled_total",
        "Near-duplicate tick emissions suppressed per instrument",
        &["instrument"]
    )
    .unwrap()
});

/// Volume baseline resets (session rollover or reconnect).
pub static VOLUME_RESETS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tapeflow_volume_resets_total",
        "Cumulative-volume regressions treated as baseline resets",
        &["instrument", "interval"]
    )
    .unwrap()
});

/// Entry requests refused by the risk controller.
pub static RISK_REFUSALS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tapeflow_risk_refusals_total",
        "Entry requests refused by the risk controller",
        &["instrument", "rule"]
    )
    .unwrap()
});

/// Daily circuit breaker state (1 = tripped).
pub static BREAKER_TRIPPED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "tapeflow_breaker_tripped",
        "Daily drawdown circuit breaker state (1=tripped)"
    )
    .unwrap()
});

/// Events dropped at the signal-sink boundary.
pub static SINK_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tapeflow_sink_dropped_total",
        "Sink events lost to slow or absent consumers",
        &["kind"]
    )
    .unwrap()
});
