//! Feed events: the merge layer's input and output.

use crate::error::{CoreError, CoreResult};
use crate::{FeedSource, Instrument, Interval, Price};
use serde::{Deserialize, Serialize};

/// A normalized raw event from one upstream feed adapter.
///
/// `cumulative_volume` is the session-cumulative traded volume as reported
/// by the source at this interval; price-only sources (e.g., an index)
/// leave it `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFeedEvent {
    pub instrument: Instrument,
    /// Event timestamp (Unix ms).
    pub ts_ms: i64,
    pub price: Price,
    pub cumulative_volume: Option<u64>,
    pub interval: Interval,
    pub source: FeedSource,
}

impl RawFeedEvent {
    /// Validate the event at the ingestion boundary.
    ///
    /// Malformed events are dropped without mutating any merge state.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.price.is_positive() {
            return Err(CoreError::MalformedEvent {
                field: "price",
                detail: format!("non-positive price {}", self.price),
            });
        }
        if self.ts_ms <= 0 {
            return Err(CoreError::MalformedEvent {
                field: "ts_ms",
                detail: format!("invalid timestamp {}", self.ts_ms),
            });
        }
        Ok(())
    }
}

/// One canonical, de-duplicated tick for an instrument.
///
/// Produced by the volume reconciler at most once per accepted merge
/// decision and consumed exactly once by the order-flow analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTick {
    pub instrument: Instrument,
    /// Tick timestamp (Unix ms).
    pub ts_ms: i64,
    pub last_price: Price,
    /// Non-negative volume attributed to this tick.
    pub volume_delta: u64,
    pub source: FeedSource,
    pub interval: Interval,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn event(price: Price, ts_ms: i64) -> RawFeedEvent {
        RawFeedEvent {
            instrument: Instrument::from("NIFTY"),
            ts_ms,
            price,
            cumulative_volume: Some(100),
            interval: Interval::MIN_1,
            source: FeedSource::from("dhan"),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(event(Price::new(dec!(100)), 1_700_000_000_000).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let err = event(Price::new(dec!(-1)), 1_700_000_000_000)
            .validate()
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedEvent { field: "price", .. }));
    }

    #[test]
    fn test_validate_rejects_missing_timestamp() {
        let err = event(Price::new(dec!(100)), 0).validate().unwrap_err();
        assert!(matches!(err, CoreError::MalformedEvent { field: "ts_ms", .. }));
    }
}
