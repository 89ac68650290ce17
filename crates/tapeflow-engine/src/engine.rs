//! Pipeline wiring.
//!
//! Feed adapters push normalized events into `Engine::ingest` from any
//! number of producer tasks. The merge step runs synchronously under the
//! instrument's lock; accepted ticks are handed to the instrument's
//! dedicated analyzer task over a bounded channel. The hand-off is
//! lossless: producers await channel capacity instead of dropping ticks.
//! The only lossy boundary is the signal sink.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tapeflow_core::{CanonicalTick, FeedSource, Instrument, Interval, RawFeedEvent};
use tapeflow_flow::{DeltaImbalanceDetector, EntryDetector, NoEntry, OrderFlowAnalyzer};
use tapeflow_merge::VolumeReconciler;
use tapeflow_position::PositionManager;
use tapeflow_risk::RiskController;
use tapeflow_sink::{SignalSink, SinkSubscriber};

use crate::config::EngineConfig;
use crate::snapshot::{EngineSnapshot, InstrumentSnapshot, SNAPSHOT_VERSION};

/// The assembled pipeline for one deployment.
pub struct Engine {
    config: EngineConfig,
    reconciler: VolumeReconciler,
    positions: Arc<PositionManager>,
    risk: Arc<RiskController>,
    sink: SignalSink,
    routes: DashMap<Instrument, mpsc::Sender<CanonicalTick>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let positions = Arc::new(PositionManager::new());
        let risk = Arc::new(RiskController::new(config.risk.clone(), positions.clone()));
        let sink = SignalSink::new(config.sink_capacity);
        let reconciler = VolumeReconciler::new(config.merge);

        Self {
            config,
            reconciler,
            positions,
            risk,
            sink,
            routes: DashMap::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe every instrument/interval pair named in the config.
    ///
    /// Must run inside the tokio runtime: analyzer tasks are spawned here.
    pub fn apply_subscriptions(&self) {
        for sub in self.config.subscriptions.clone() {
            let instrument = Instrument::new(sub.symbol);
            for secs in sub.interval_secs {
                self.subscribe(&instrument, Interval::new(secs));
            }
        }
    }

    /// Register a subscriber for `(instrument, interval)` and make sure
    /// the instrument has a running analyzer task.
    pub fn subscribe(&self, instrument: &Instrument, interval: Interval) {
        self.reconciler.subscribe(instrument, interval);
        self.ensure_analyzer(instrument);
    }

    /// Remove the subscriber for `(instrument, interval)`.
    pub fn unsubscribe(&self, instrument: &Instrument, interval: Interval) {
        self.reconciler.unsubscribe(instrument, interval);
    }

    /// A feed adapter disconnected: forget its volume baselines so the
    /// first post-reconnect observation is treated as a first one.
    /// Subscriptions and primary-interval selection are untouched.
    pub fn source_disconnected(&self, source: &FeedSource) {
        info!(%source, "feed source disconnected");
        self.reconciler.invalidate_source(source);
    }

    /// Ingest one normalized feed event.
    ///
    /// Runs the synchronous merge, then hands any accepted tick to the
    /// instrument's analyzer task in order.
    pub async fn ingest(&self, event: &RawFeedEvent) {
        let Some(tick) = self.reconciler.record(event) else {
            return;
        };

        let sender = self.routes.get(&tick.instrument).map(|s| s.clone());
        match sender {
            Some(tx) => {
                if tx.send(tick).await.is_err() {
                    warn!(instrument = %event.instrument, "analyzer task gone, tick dropped");
                }
            }
            None => {
                warn!(instrument = %event.instrument, "tick for instrument with no analyzer");
            }
        }
    }

    fn ensure_analyzer(&self, instrument: &Instrument) {
        use dashmap::mapref::entry::Entry;

        match self.routes.entry(instrument.clone()) {
            Entry::Occupied(_) => {}
            Entry::Vacant(v) => {
                let (tx, mut rx) = mpsc::channel(self.config.analyzer_queue_depth);
                let mut analyzer = OrderFlowAnalyzer::with_standard_exits(
                    instrument.clone(),
                    self.config.flow.clone(),
                    self.positions.clone(),
                    self.risk.clone(),
                    self.sink.clone(),
                    self.entry_detector(),
                );

                let task_instrument = instrument.clone();
                let handle = tokio::spawn(async move {
                    // Single writer per instrument: entry/exit evaluation
                    // is order-sensitive.
                    while let Some(tick) = rx.recv().await {
                        analyzer.on_tick(&tick);
                    }
                    debug!(instrument = %task_instrument, "analyzer task stopped");
                });

                self.tasks.lock().push(handle);
                v.insert(tx);
                debug!(%instrument, "analyzer task started");
            }
        }
    }

    fn entry_detector(&self) -> Box<dyn EntryDetector> {
        if self.config.entry_delta_threshold > 0 {
            Box::new(DeltaImbalanceDetector::new(self.config.entry_delta_threshold))
        } else {
            Box::new(NoEntry)
        }
    }

    /// Attach a downstream consumer of signals and bars.
    pub fn subscribe_events(&self) -> SinkSubscriber {
        self.sink.subscribe()
    }

    /// Reset daily stats at session start. The risk breaker is
    /// process-lifetime and is not cleared here.
    pub fn reset_daily(&self) {
        self.positions.reset_daily();
    }

    /// Capture restartable state: positions, daily stats, and volume
    /// baselines per tracked instrument.
    pub fn export_snapshot(&self) -> EngineSnapshot {
        let instruments = self
            .routes
            .iter()
            .map(|entry| {
                let instrument = entry.key().clone();
                InstrumentSnapshot {
                    position: self.positions.get_position(&instrument),
                    trackers: self.reconciler.export_trackers(&instrument),
                    instrument,
                }
            })
            .collect();

        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            daily: self.positions.daily_stats(),
            instruments,
        }
    }

    /// Restore state from a snapshot taken by `export_snapshot`.
    pub fn restore_snapshot(&self, snapshot: EngineSnapshot) {
        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                found = snapshot.version,
                expected = SNAPSHOT_VERSION,
                "snapshot version mismatch, loading with field defaults"
            );
        }

        for slice in snapshot.instruments {
            self.reconciler
                .restore_trackers(&slice.instrument, slice.trackers);
            if let Some(position) = slice.position {
                self.positions.restore_positions(vec![position]);
            }
        }
        self.positions.restore_daily(snapshot.daily);
        info!("engine state restored from snapshot");
    }

    /// Drain and stop all analyzer tasks. Queued ticks are processed
    /// before each task exits.
    pub async fn shutdown(&self) {
        self.routes.clear();
        let handles: Vec<_> = std::mem::take(&mut *self.tasks.lock());
        for handle in handles {
            let _ = handle.await;
        }
        info!("engine stopped");
    }

    pub fn positions(&self) -> &Arc<PositionManager> {
        &self.positions
    }

    pub fn risk(&self) -> &Arc<RiskController> {
        &self.risk
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
