//! Footprint bars: aggressor-classified volume per bar period.

use crate::{Instrument, Price};
use serde::{Deserialize, Serialize};

/// A footprint bar with buy/sell volume split.
///
/// Mutated by the analyzer while open; immutable once finalized at the bar
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootprintBar {
    pub instrument: Instrument,
    /// Bar open timestamp (Unix ms, aligned to the bar period).
    pub ts_open: i64,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    /// Volume classified as buyer-initiated.
    pub buy_volume: u64,
    /// Volume classified as seller-initiated.
    pub sell_volume: u64,
}

impl FootprintBar {
    /// Open a new bar at `ts_open` with the first traded price.
    pub fn open_at(instrument: Instrument, ts_open: i64, price: Price) -> Self {
        Self {
            instrument,
            ts_open,
            open: price,
            high: price,
            low: price,
            close: price,
            buy_volume: 0,
            sell_volume: 0,
        }
    }

    /// Fold one classified tick into the bar.
    pub fn apply(&mut self, price: Price, volume: u64, is_buy: bool) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        if is_buy {
            self.buy_volume += volume;
        } else {
            self.sell_volume += volume;
        }
    }

    /// Net order-flow delta: buy volume minus sell volume.
    pub fn delta(&self) -> i64 {
        self.buy_volume as i64 - self.sell_volume as i64
    }

    /// Total classified volume in the bar.
    pub fn total_volume(&self) -> u64 {
        self.buy_volume + self.sell_volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bar_ohlc_and_delta() {
        let mut bar =
            FootprintBar::open_at(Instrument::from("NIFTY"), 60_000, Price::new(dec!(100)));
        bar.apply(Price::new(dec!(101)), 10, true);
        bar.apply(Price::new(dec!(99)), 4, false);
        bar.apply(Price::new(dec!(100.5)), 6, true);

        assert_eq!(bar.open, Price::new(dec!(100)));
        assert_eq!(bar.high, Price::new(dec!(101)));
        assert_eq!(bar.low, Price::new(dec!(99)));
        assert_eq!(bar.close, Price::new(dec!(100.5)));
        assert_eq!(bar.buy_volume, 16);
        assert_eq!(bar.sell_volume, 4);
        assert_eq!(bar.delta(), 12);
        assert_eq!(bar.total_volume(), 20);
    }
}
