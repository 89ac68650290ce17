//! Pluggable entry-signal detection.
//!
//! The strategy behind entries is deliberately open-ended; the analyzer
//! only requires the detector contract. A minimal delta-imbalance
//! detector is provided so the seam is exercised end-to-end, plus a null
//! detector for observation-only runs.

use tapeflow_core::{CanonicalTick, FootprintBar, Price, Side};

/// A requested entry, subject to the risk gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    pub side: Side,
    pub price: Price,
    pub reason: String,
}

/// Entry-signal detection over the classified tick stream.
///
/// Called only while the instrument is flat; the open footprint bar
/// reflects the current tick.
pub trait EntryDetector: Send {
    fn evaluate(&mut self, tick: &CanonicalTick, bar: &FootprintBar) -> Option<EntryRequest>;
}

/// Enter in the direction of a strong net order-flow imbalance in the
/// open bar.
#[derive(Debug, Clone)]
pub struct DeltaImbalanceDetector {
    /// Net delta (buy minus sell volume) that constitutes an imbalance.
    pub delta_threshold: i64,
}

impl DeltaImbalanceDetector {
    pub fn new(delta_threshold: i64) -> Self {
        Self { delta_threshold }
    }
}

impl EntryDetector for DeltaImbalanceDetector {
    fn evaluate(&mut self, tick: &CanonicalTick, bar: &FootprintBar) -> Option<EntryRequest> {
        let delta = bar.delta();
        if delta >= self.delta_threshold {
            Some(EntryRequest {
                side: Side::Long,
                price: tick.last_price,
                reason: "Delta Imbalance".to_string(),
            })
        } else if delta <= -self.delta_threshold {
            Some(EntryRequest {
                side: Side::Short,
                price: tick.last_price,
                reason: "Delta Imbalance".to_string(),
            })
        } else {
            None
        }
    }
}

/// Never requests an entry. Useful for observation-only deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEntry;

impl EntryDetector for NoEntry {
    fn evaluate(&mut self, _tick: &CanonicalTick, _bar: &FootprintBar) -> Option<EntryRequest> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tapeflow_core::{FeedSource, Instrument, Interval};

    fn tick(price: rust_decimal::Decimal) -> CanonicalTick {
        CanonicalTick {
            instrument: Instrument::from("NIFTY"),
            ts_ms: 1_000,
            last_price: Price::new(price),
            volume_delta: 1,
            source: FeedSource::from("dhan"),
            interval: Interval::MIN_1,
        }
    }

    fn bar(buy: u64, sell: u64) -> FootprintBar {
        let mut b = FootprintBar::open_at(Instrument::from("NIFTY"), 0, Price::new(dec!(100)));
        b.buy_volume = buy;
        b.sell_volume = sell;
        b
    }

    #[test]
    fn test_imbalance_long_short_and_neutral() {
        let mut detector = DeltaImbalanceDetector::new(50);

        let long = detector.evaluate(&tick(dec!(100)), &bar(80, 20)).unwrap();
        assert_eq!(long.side, Side::Long);

        let short = detector.evaluate(&tick(dec!(100)), &bar(20, 80)).unwrap();
        assert_eq!(short.side, Side::Short);

        assert!(detector.evaluate(&tick(dec!(100)), &bar(60, 40)).is_none());
    }

    #[test]
    fn test_no_entry_is_silent() {
        let mut detector = NoEntry;
        assert!(detector.evaluate(&tick(dec!(100)), &bar(100, 0)).is_none());
    }
}
