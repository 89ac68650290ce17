//! Pluggable exit policies.
//!
//! The analyzer calls the injected policy once per tick while a position
//! is open; the first satisfied condition wins. Priority among conditions
//! is encoded by `CompositeExit` ordering: trailing stop, then profit
//! target, then time exit.

use rust_decimal::Decimal;

use tapeflow_core::{Price, Side};
use tapeflow_position::Position;

/// Exit reason strings are part of the sink contract.
pub const REASON_TRAILING_STOP: &str = "Trailing Stop";
pub const REASON_TARGET_1: &str = "Target 1 Hit";
pub const REASON_TIME_EXIT: &str = "Time Exit";

/// A decided exit for the current tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitDecision {
    pub reason: String,
}

impl ExitDecision {
    fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

/// An exit condition evaluated once per tick against the open position.
///
/// `position` carries since-entry extremes already updated with the
/// current tick's price.
pub trait ExitPolicy: Send {
    fn evaluate(&self, position: &Position, price: Price, ts_ms: i64) -> Option<ExitDecision>;
}

/// Trailing stop: the stop level follows the favorable extreme and never
/// retraces.
#[derive(Debug, Clone)]
pub struct TrailingStopExit {
    pub trailing_points: Decimal,
}

impl TrailingStopExit {
    pub fn new(trailing_points: Decimal) -> Self {
        Self { trailing_points }
    }

    /// Current stop level for the position. Non-decreasing for longs,
    /// non-increasing for shorts.
    pub fn stop_level(&self, position: &Position) -> Price {
        match position.side {
            Side::Long => Price::new(
                position.highest_price_since_entry.inner() - self.trailing_points,
            ),
            Side::Short => Price::new(
                position.lowest_price_since_entry.inner() + self.trailing_points,
            ),
        }
    }
}

impl ExitPolicy for TrailingStopExit {
    fn evaluate(&self, position: &Position, price: Price, _ts_ms: i64) -> Option<ExitDecision> {
        let stop = self.stop_level(position);
        let hit = match position.side {
            Side::Long => price < stop,
            Side::Short => price > stop,
        };
        hit.then(|| ExitDecision::new(REASON_TRAILING_STOP))
    }
}

/// Fixed profit target in points from the entry price.
#[derive(Debug, Clone)]
pub struct FixedTargetExit {
    pub target_points: Decimal,
}

impl FixedTargetExit {
    pub fn new(target_points: Decimal) -> Self {
        Self { target_points }
    }
}

impl ExitPolicy for FixedTargetExit {
    fn evaluate(&self, position: &Position, price: Price, _ts_ms: i64) -> Option<ExitDecision> {
        let hit = match position.side {
            Side::Long => price.inner() >= position.entry_price.inner() + self.target_points,
            Side::Short => price.inner() <= position.entry_price.inner() - self.target_points,
        };
        hit.then(|| ExitDecision::new(REASON_TARGET_1))
    }
}

/// Forced close after a maximum holding time.
#[derive(Debug, Clone)]
pub struct TimeStopExit {
    pub max_hold_ms: i64,
}

impl TimeStopExit {
    pub fn new(max_hold_ms: i64) -> Self {
        Self { max_hold_ms }
    }
}

impl ExitPolicy for TimeStopExit {
    fn evaluate(&self, position: &Position, _price: Price, ts_ms: i64) -> Option<ExitDecision> {
        (position.holding_time_ms(ts_ms) >= self.max_hold_ms)
            .then(|| ExitDecision::new(REASON_TIME_EXIT))
    }
}

/// Ordered composition of exit policies; the first satisfied one wins.
pub struct CompositeExit {
    policies: Vec<Box<dyn ExitPolicy>>,
}

impl CompositeExit {
    pub fn new(policies: Vec<Box<dyn ExitPolicy>>) -> Self {
        Self { policies }
    }

    /// The standard priority: trailing stop, profit target, time exit.
    pub fn standard(trailing_points: Decimal, target_points: Decimal, max_hold_ms: i64) -> Self {
        Self::new(vec![
            Box::new(TrailingStopExit::new(trailing_points)),
            Box::new(FixedTargetExit::new(target_points)),
            Box::new(TimeStopExit::new(max_hold_ms)),
        ])
    }
}

impl ExitPolicy for CompositeExit {
    fn evaluate(&self, position: &Position, price: Price, ts_ms: i64) -> Option<ExitDecision> {
        self.policies
            .iter()
            .find_map(|p| p.evaluate(position, price, ts_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tapeflow_core::Instrument;

    fn long_at(entry: Decimal, high: Decimal, low: Decimal) -> Position {
        let mut p = Position::new(
            Instrument::from("NIFTY"),
            Side::Long,
            1,
            Price::new(entry),
            1_000,
        );
        p.highest_price_since_entry = Price::new(high);
        p.lowest_price_since_entry = Price::new(low);
        p
    }

    fn short_at(entry: Decimal, high: Decimal, low: Decimal) -> Position {
        let mut p = Position::new(
            Instrument::from("NIFTY"),
            Side::Short,
            1,
            Price::new(entry),
            1_000,
        );
        p.highest_price_since_entry = Price::new(high);
        p.lowest_price_since_entry = Price::new(low);
        p
    }

    #[test]
    fn test_trailing_stop_long() {
        let policy = TrailingStopExit::new(dec!(5));
        let position = long_at(dec!(100), dec!(120), dec!(100));

        // Stop level = 120 - 5 = 115.
        assert_eq!(policy.stop_level(&position), Price::new(dec!(115)));
        assert!(policy
            .evaluate(&position, Price::new(dec!(114.95)), 2_000)
            .is_some());
        assert!(policy
            .evaluate(&position, Price::new(dec!(115)), 2_000)
            .is_none());
    }

    #[test]
    fn test_trailing_stop_short() {
        let policy = TrailingStopExit::new(dec!(5));
        let position = short_at(dec!(100), dec!(100), dec!(90));

        // Stop level = 90 + 5 = 95.
        assert!(policy
            .evaluate(&position, Price::new(dec!(95.05)), 2_000)
            .is_some());
        assert!(policy
            .evaluate(&position, Price::new(dec!(95)), 2_000)
            .is_none());
    }

    #[test]
    fn test_trailing_stop_level_never_retraces() {
        let policy = TrailingStopExit::new(dec!(5));
        let mut position = long_at(dec!(100), dec!(100), dec!(100));

        let mut last_stop = policy.stop_level(&position);
        for price in [dec!(104), dec!(102), dec!(110), dec!(107), dec!(112)] {
            position.update_extremes(Price::new(price));
            let stop = policy.stop_level(&position);
            assert!(stop >= last_stop, "stop retraced: {stop} < {last_stop}");
            last_stop = stop;
        }
    }

    #[test]
    fn test_fixed_target() {
        let policy = FixedTargetExit::new(dec!(10));
        let long = long_at(dec!(100), dec!(110), dec!(100));
        assert_eq!(
            policy
                .evaluate(&long, Price::new(dec!(110)), 2_000)
                .unwrap()
                .reason,
            REASON_TARGET_1
        );
        assert!(policy
            .evaluate(&long, Price::new(dec!(109.95)), 2_000)
            .is_none());

        let short = short_at(dec!(100), dec!(100), dec!(90));
        assert!(policy
            .evaluate(&short, Price::new(dec!(90)), 2_000)
            .is_some());
    }

    #[test]
    fn test_time_stop() {
        let policy = TimeStopExit::new(30_000);
        let position = long_at(dec!(100), dec!(100), dec!(100));

        assert!(policy
            .evaluate(&position, Price::new(dec!(100)), 30_999)
            .is_none());
        assert_eq!(
            policy
                .evaluate(&position, Price::new(dec!(100)), 31_000)
                .unwrap()
                .reason,
            REASON_TIME_EXIT
        );
    }

    #[test]
    fn test_composite_priority_trailing_beats_target() {
        // Entry 100, high 120, tick at 112: trailing (112 < 115) and
        // target (112 >= 110) are both nominally satisfied. Trailing
        // outranks target.
        let policy = CompositeExit::standard(dec!(5), dec!(10), 300_000);
        let position = long_at(dec!(100), dec!(120), dec!(100));

        let decision = policy
            .evaluate(&position, Price::new(dec!(112)), 2_000)
            .unwrap();
        assert_eq!(decision.reason, REASON_TRAILING_STOP);
    }

    #[test]
    fn test_composite_priority_target_beats_time() {
        let policy = CompositeExit::standard(dec!(50), dec!(10), 10_000);
        let position = long_at(dec!(100), dec!(110), dec!(100));

        // Both target and time are satisfied at this tick; target wins.
        let decision = policy
            .evaluate(&position, Price::new(dec!(110)), 1_000_000)
            .unwrap();
        assert_eq!(decision.reason, REASON_TARGET_1);
    }
}
