//! The per-instrument order-flow state machine.
//!
//! Consumes the canonical tick stream for one instrument. Processing is
//! strictly sequential per instrument (single logical writer); the
//! entry/exit evaluation is order-sensitive.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tapeflow_core::{
    Aggressor, CanonicalTick, FootprintBar, Instrument, SignalAction, TradeSignal,
};
use tapeflow_position::PositionManager;
use tapeflow_risk::RiskController;
use tapeflow_sink::SignalSink;

use crate::entry::{EntryDetector, EntryRequest};
use crate::exit::{CompositeExit, ExitPolicy};

/// Analyzer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Footprint bar period (ms). Default: 60,000 (one minute).
    #[serde(default = "default_bar_period_ms")]
    pub bar_period_ms: i64,
    /// Trailing stop distance in points. Default: 5.
    #[serde(default = "default_trailing_stop_points")]
    pub trailing_stop_points: Decimal,
    /// First profit target in points from entry. Default: 10.
    #[serde(default = "default_target_points")]
    pub target_points: Decimal,
    /// Maximum holding time in seconds before a forced close. Default: 300.
    #[serde(default = "default_max_hold_time_secs")]
    pub max_hold_time_secs: i64,
    /// Quantity requested per entry. Default: 1.
    #[serde(default = "default_entry_quantity")]
    pub entry_quantity: u32,
}

fn default_bar_period_ms() -> i64 {
    60_000
}

fn default_trailing_stop_points() -> Decimal {
    Decimal::from(5)
}

fn default_target_points() -> Decimal {
    Decimal::from(10)
}

fn default_max_hold_time_secs() -> i64 {
    300
}

fn default_entry_quantity() -> u32 {
    1
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            bar_period_ms: default_bar_period_ms(),
            trailing_stop_points: default_trailing_stop_points(),
            target_points: default_target_points(),
            max_hold_time_secs: default_max_hold_time_secs(),
            entry_quantity: default_entry_quantity(),
        }
    }
}

/// Order-flow analyzer for one instrument.
pub struct OrderFlowAnalyzer {
    instrument: Instrument,
    config: FlowConfig,
    positions: Arc<PositionManager>,
    risk: Arc<RiskController>,
    sink: SignalSink,
    entry_detector: Box<dyn EntryDetector>,
    exit_policy: Box<dyn ExitPolicy>,
    last_price: Option<tapeflow_core::Price>,
    last_aggressor: Option<Aggressor>,
    bar: Option<FootprintBar>,
}

impl OrderFlowAnalyzer {
    pub fn new(
        instrument: Instrument,
        config: FlowConfig,
        positions: Arc<PositionManager>,
        risk: Arc<RiskController>,
        sink: SignalSink,
        entry_detector: Box<dyn EntryDetector>,
        exit_policy: Box<dyn ExitPolicy>,
    ) -> Self {
        Self {
            instrument,
            config,
            positions,
            risk,
            sink,
            entry_detector,
            exit_policy,
            last_price: None,
            last_aggressor: None,
            bar: None,
        }
    }

    /// Construct with the standard composite exit policy built from the
    /// config: trailing stop, then profit target, then time exit.
    pub fn with_standard_exits(
        instrument: Instrument,
        config: FlowConfig,
        positions: Arc<PositionManager>,
        risk: Arc<RiskController>,
        sink: SignalSink,
        entry_detector: Box<dyn EntryDetector>,
    ) -> Self {
        let exit_policy = Box::new(CompositeExit::standard(
            config.trailing_stop_points,
            config.target_points,
            config.max_hold_time_secs * 1_000,
        ));
        Self::new(
            instrument,
            config,
            positions,
            risk,
            sink,
            entry_detector,
            exit_policy,
        )
    }

    /// Process one canonical tick.
    ///
    /// Produces at most one state transition: while positioned, exits are
    /// re-evaluated on every tick; entry detection runs only while flat.
    pub fn on_tick(&mut self, tick: &CanonicalTick) {
        debug_assert_eq!(tick.instrument, self.instrument);

        let aggressor = Aggressor::classify(tick.last_price, self.last_price, self.last_aggressor);
        self.accrue_bar(tick, aggressor);
        self.last_price = Some(tick.last_price);
        self.last_aggressor = Some(aggressor);

        if let Some(position) = self.positions.update_extremes(&self.instrument, tick.last_price)
        {
            if let Some(decision) =
                self.exit_policy
                    .evaluate(&position, tick.last_price, tick.ts_ms)
            {
                self.close(tick, &decision.reason);
            }
            // One transition per tick: no entry evaluation after an exit,
            // and no stacking while positioned.
            return;
        }

        let request = match &self.bar {
            Some(bar) => self.entry_detector.evaluate(tick, bar),
            None => None,
        };
        if let Some(request) = request {
            self.try_enter(tick, request);
        }
    }

    /// Fold the classified tick into the open bar, finalizing at bar
    /// boundaries.
    fn accrue_bar(&mut self, tick: &CanonicalTick, aggressor: Aggressor) {
        let ts_open = tick.ts_ms - tick.ts_ms.rem_euclid(self.config.bar_period_ms);

        let rollover = match &self.bar {
            Some(bar) => bar.ts_open != ts_open,
            None => true,
        };
        if rollover {
            if let Some(closed) = self.bar.take() {
                debug!(instrument = %self.instrument, ts_open = closed.ts_open,
                    delta = closed.delta(), "footprint bar closed");
                self.sink.publish_bar(closed);
            }
            self.bar = Some(FootprintBar::open_at(
                self.instrument.clone(),
                ts_open,
                tick.last_price,
            ));
        }

        if let Some(bar) = &mut self.bar {
            bar.apply(tick.last_price, tick.volume_delta, aggressor.is_buy());
        }
    }

    /// Attempt an entry: consult the risk gate, then open the position.
    /// A refusal discards the signal; it is never retried.
    fn try_enter(&mut self, tick: &CanonicalTick, request: EntryRequest) {
        if !self
            .risk
            .can_trade(request.side, &self.instrument, self.config.entry_quantity)
        {
            debug!(instrument = %self.instrument, side = %request.side,
                "entry refused by risk gate, signal discarded");
            return;
        }

        match self.positions.open_position(
            self.instrument.clone(),
            request.side,
            self.config.entry_quantity,
            request.price,
            tick.ts_ms,
        ) {
            Ok(_) => {
                info!(instrument = %self.instrument, side = %request.side,
                    price = %request.price, reason = %request.reason, "entry");
                self.sink.publish_signal(TradeSignal {
                    instrument: self.instrument.clone(),
                    action: SignalAction::Entry,
                    side: request.side,
                    price: request.price,
                    ts_ms: tick.ts_ms,
                    reason: request.reason,
                });
            }
            Err(e) => {
                // Second entry while positioned: a logged no-op, never an
                // error up the stack.
                debug!(instrument = %self.instrument, error = %e, "duplicate entry ignored");
            }
        }
    }

    fn close(&mut self, tick: &CanonicalTick, reason: &str) {
        match self
            .positions
            .close_position(&self.instrument, tick.last_price, tick.ts_ms, reason)
        {
            Ok(record) => {
                self.sink.publish_signal(TradeSignal {
                    instrument: self.instrument.clone(),
                    action: SignalAction::Exit,
                    side: record.side,
                    price: tick.last_price,
                    ts_ms: tick.ts_ms,
                    reason: reason.to_string(),
                });
            }
            Err(e) => {
                debug!(instrument = %self.instrument, error = %e, "close without position ignored");
            }
        }
    }

    /// The currently open bar, if any.
    pub fn current_bar(&self) -> Option<&FootprintBar> {
        self.bar.as_ref()
    }
}
