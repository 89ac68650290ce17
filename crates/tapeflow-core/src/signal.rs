//! Trade direction, aggressor classification, and analyzer output events.

use crate::{Instrument, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a position or entry request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Aggressor side of a single tick under the standard tick rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggressor {
    Buy,
    Sell,
}

impl Aggressor {
    /// Classify a tick from its price relative to the previous price.
    ///
    /// Unchanged price inherits the previous classification (`prev`);
    /// the very first tick with no history defaults to `Buy`.
    pub fn classify(price: Price, prev_price: Option<Price>, prev: Option<Aggressor>) -> Self {
        match prev_price {
            Some(p) if price > p => Self::Buy,
            Some(p) if price < p => Self::Sell,
            Some(_) => prev.unwrap_or(Self::Buy),
            None => prev.unwrap_or(Self::Buy),
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

/// Signal action: a position was opened or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Entry,
    Exit,
}

/// A trade-signal event emitted to the signal sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub instrument: Instrument,
    pub action: SignalAction,
    pub side: Side,
    pub price: Price,
    /// Signal timestamp (Unix ms).
    pub ts_ms: i64,
    pub reason: String,
}

/// An immutable record of one closed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub instrument: Instrument,
    pub side: Side,
    pub entry_price: Price,
    /// Entry timestamp (Unix ms).
    pub entry_ts_ms: i64,
    pub exit_price: Price,
    /// Exit timestamp (Unix ms).
    pub exit_ts_ms: i64,
    /// Realized PnL in points: exit-entry for long, entry-exit for short.
    pub pnl: Decimal,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tick_rule_uptick_downtick() {
        let p100 = Price::new(dec!(100));
        let p101 = Price::new(dec!(101));
        assert_eq!(Aggressor::classify(p101, Some(p100), None), Aggressor::Buy);
        assert_eq!(Aggressor::classify(p100, Some(p101), None), Aggressor::Sell);
    }

    #[test]
    fn test_tick_rule_unchanged_inherits() {
        let p = Price::new(dec!(100));
        assert_eq!(
            Aggressor::classify(p, Some(p), Some(Aggressor::Sell)),
            Aggressor::Sell
        );
        assert_eq!(
            Aggressor::classify(p, Some(p), Some(Aggressor::Buy)),
            Aggressor::Buy
        );
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Short.opposite(), Side::Long);
    }
}
