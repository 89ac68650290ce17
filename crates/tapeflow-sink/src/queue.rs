//! Bounded fan-out of signal and bar events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use tapeflow_core::{FootprintBar, TradeSignal};
use tapeflow_telemetry::metrics::SINK_DROPPED_TOTAL;

/// An event bound for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkEvent {
    Signal(TradeSignal),
    Bar(FootprintBar),
}

impl SinkEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Signal(_) => "signal",
            Self::Bar(_) => "bar",
        }
    }
}

/// Publisher side of the sink boundary.
///
/// Publishing never blocks and never fails upward: with no receivers
/// connected the event is simply gone, and lagging receivers lose the
/// oldest queued items (freshness over completeness). Position and PnL
/// state is derived from the in-process state machine, never from sink
/// delivery.
#[derive(Clone)]
pub struct SignalSink {
    tx: broadcast::Sender<SinkEvent>,
}

impl SignalSink {
    /// Create a sink with the given per-receiver queue capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a trade signal. Fire-and-forget.
    pub fn publish_signal(&self, signal: TradeSignal) {
        self.publish(SinkEvent::Signal(signal));
    }

    /// Publish a finalized footprint bar. Fire-and-forget.
    pub fn publish_bar(&self, bar: FootprintBar) {
        self.publish(SinkEvent::Bar(bar));
    }

    fn publish(&self, event: SinkEvent) {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(n) => trace!(kind, receivers = n, "sink event published"),
            Err(_) => {
                // No receivers connected: normal when no dashboard is up.
                SINK_DROPPED_TOTAL.with_label_values(&[kind]).inc();
                trace!(kind, "sink event dropped, no receivers");
            }
        }
    }

    /// Attach a consumer.
    pub fn subscribe(&self) -> SinkSubscriber {
        SinkSubscriber {
            rx: self.tx.subscribe(),
        }
    }
}

/// Consumer side. Lag is absorbed here: when the consumer falls behind,
/// the oldest events are discarded and counted, and receiving continues
/// from the next available event.
pub struct SinkSubscriber {
    rx: broadcast::Receiver<SinkEvent>,
}

impl SinkSubscriber {
    /// Receive the next event, skipping over any lag gap.
    ///
    /// Returns `None` when the sink has been dropped.
    pub async fn recv(&mut self) -> Option<SinkEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    SINK_DROPPED_TOTAL
                        .with_label_values(&["lagged"])
                        .inc_by(n as f64);
                    trace!(dropped = n, "sink consumer lagged, oldest events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
