//! Stream driver: wires a source, the aggregator and the emitter together.
//!
//! Three tasks run concurrently:
//!
//! - **reader** pulls payloads from the [`EventSource`] into a bounded
//!   channel. A full channel suspends the reader instead of dropping data.
//! - **aggregation** drains the channel and runs decode, normalize and ingest.
//!   Per-event failures are counted and dropped.
//! - **flush** ticks every `flush_interval` and runs an emission cycle. A
//!   failed cycle is logged; its windows are retried on the next tick.
//!
//! On shutdown (signal, end of stream or source loss) the reader stops, the
//! channel is drained, the timer is stopped and a final forced cycle emits
//! everything still pending. If the aggregation task dies the reader stops
//! too and the run fails with [`PipelineError::AggregationFailed`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::emitter::{CycleReport, SnapshotEmitter};
use crate::engine::{lock, SharedAggregator, WindowedAggregator};
use crate::error::{IngestError, NormalizeError, PipelineError};
use crate::normalize::{decode_payload, normalize};
use crate::sink::{FsSnapshotSink, SnapshotSink};
use crate::source::EventSource;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::types::{to_utc, OrderEvent};

/// Summary returned after a clean shutdown.
#[derive(Debug, Clone, Serialize)]
pub struct DriverReport {
    pub stats: StatsSnapshot,
    pub final_cycle: CycleReport,
}

pub struct StreamDriver {
    config: PipelineConfig,
    aggregator: SharedAggregator,
    emitter: Arc<SnapshotEmitter>,
    stats: Arc<PipelineStats>,
}

impl StreamDriver {
    pub fn new(config: PipelineConfig, sink: Arc<dyn SnapshotSink>) -> Result<Self, PipelineError> {
        config.validate()?;
        let aggregator =
            WindowedAggregator::new(config.window_size, config.allowed_lateness).into_shared();
        let stats = Arc::new(PipelineStats::new());
        let emitter = Arc::new(SnapshotEmitter::new(
            aggregator.clone(),
            sink,
            config.retry.clone(),
            stats.clone(),
        ));
        Ok(Self {
            config,
            aggregator,
            emitter,
            stats,
        })
    }

    /// Driver writing to a [`FsSnapshotSink`] under `config.sink_directory`.
    pub fn with_fs_sink(config: PipelineConfig) -> Result<Self, PipelineError> {
        let sink = FsSnapshotSink::new(&config.sink_directory).map_err(|e| {
            PipelineError::SinkWriteFailure {
                location: config.sink_directory.display().to_string(),
                attempts: 1,
                reason: format!("{:#}", e),
            }
        })?;
        Self::new(config, Arc::new(sink))
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    pub fn aggregator(&self) -> SharedAggregator {
        self.aggregator.clone()
    }

    /// Run until end of stream, a `true` on `shutdown`, or source loss.
    pub async fn run(
        self,
        source: Box<dyn EventSource>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<DriverReport, PipelineError> {
        let endpoint = source.endpoint().to_string();
        info!(
            %endpoint,
            window_size = ?self.config.window_size,
            allowed_lateness = ?self.config.allowed_lateness,
            flush_interval = ?self.config.flush_interval(),
            "stream driver starting"
        );

        let (payload_tx, payload_rx) = mpsc::channel(self.config.buffer_capacity);
        let (stop_tx, stop_rx) = watch::channel(false);

        let reader = tokio::spawn(read_loop(source, payload_tx, shutdown));
        let aggregation = tokio::spawn(aggregate_loop(
            payload_rx,
            self.aggregator.clone(),
            self.stats.clone(),
            self.config.log_events,
        ));
        let flusher = tokio::spawn(flush_loop(
            self.emitter.clone(),
            self.stats.clone(),
            self.config.flush_interval(),
            stop_rx,
        ));

        let read_result = reader
            .await
            .unwrap_or_else(|e| Err(anyhow!("reader task failed: {}", e)));
        let aggregation_result = aggregation_outcome(aggregation.await);
        let _ = stop_tx.send(true);
        if let Err(e) = flusher.await {
            error!(error = %e, "flush task failed");
        }

        let pending = lock(&self.aggregator).store().len();
        info!(pending, "final flush");
        let final_result = self.emitter.run_cycle(true).await;
        let stats = self.stats.snapshot();
        info!(?stats, "stream driver stopped");

        if let Err(e) = aggregation_result {
            if let Err(flush_err) = &final_result {
                error!(error = %flush_err, "final flush failed after aggregation failure");
            }
            return Err(e);
        }
        if let Err(e) = read_result {
            if let Err(flush_err) = &final_result {
                error!(error = %flush_err, "final flush failed after source loss");
            }
            return Err(PipelineError::SourceConnectionLost {
                endpoint,
                reason: format!("{:#}", e),
            });
        }
        let final_cycle = final_result?;
        Ok(DriverReport { stats, final_cycle })
    }
}

/// A panicked or cancelled aggregation task is fatal: payloads read after
/// that point were never counted.
fn aggregation_outcome(joined: Result<(), JoinError>) -> Result<(), PipelineError> {
    joined.map_err(|e| {
        error!(error = %e, "aggregation task failed");
        PipelineError::AggregationFailed(e.to_string())
    })
}

async fn read_loop(
    mut source: Box<dyn EventSource>,
    tx: mpsc::Sender<Vec<u8>>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    if *shutdown.borrow() {
        return Ok(());
    }
    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("shutdown requested, stop reading");
                    return Ok(());
                }
            }
            _ = tx.closed() => {
                return Err(anyhow!("aggregation stopped receiving payloads"));
            }
            next = source.next_payload() => {
                match next {
                    Ok(Some(payload)) => {
                        if tx.send(payload).await.is_err() {
                            return Err(anyhow!("aggregation stopped receiving payloads"));
                        }
                    }
                    Ok(None) => {
                        info!(endpoint = source.endpoint(), "end of stream");
                        return Ok(());
                    }
                    Err(e) => {
                        error!(endpoint = source.endpoint(), error = %e, "source connection lost");
                        return Err(e);
                    }
                }
            }
        }
    }
}

async fn aggregate_loop(
    mut rx: mpsc::Receiver<Vec<u8>>,
    aggregator: SharedAggregator,
    stats: Arc<PipelineStats>,
    log_events: bool,
) {
    while let Some(payload) = rx.recv().await {
        stats.record_payload();
        let records = match decode_payload(&payload) {
            Ok(records) => records,
            Err(e) => {
                stats.record_malformed();
                debug!(error = %e, "dropping payload");
                continue;
            }
        };

        let mut events = Vec::with_capacity(records.len());
        for record in &records {
            match normalize(record) {
                Ok(event) => events.push(event),
                Err(e) => {
                    match e {
                        NormalizeError::MalformedRecord(_) => stats.record_malformed(),
                        NormalizeError::UnknownOrderType(_) => stats.record_unknown_order_type(),
                    }
                    debug!(error = %e, "dropping record");
                }
            }
        }

        let mut engine = lock(&aggregator);
        for event in &events {
            match engine.ingest(event) {
                Ok(()) => {
                    stats.record_accepted();
                    if log_events {
                        log_event(event);
                    }
                }
                Err(IngestError::Late(late)) => {
                    stats.record_late();
                    debug!(invoice = %event.invoice_id, error = %late, "late event");
                }
                Err(IngestError::Overflow(e)) => {
                    stats.record_overflow();
                    warn!(timestamp = event.timestamp, country = %event.country, error = %e, "dropping event");
                }
            }
        }
    }
    debug!("aggregation drained");
}

fn log_event(event: &OrderEvent) {
    info!(
        invoice = %event.invoice_id,
        country = %event.country,
        timestamp = %to_utc(event.timestamp),
        order_type = %event.order_type,
        sku = %event.sku,
        quantity = event.quantity,
        total_cost = %event.total_cost,
        total_items = event.item_count(),
        is_order = event.is_order(),
        is_return = event.is_return(),
        "order"
    );
}

async fn flush_loop(
    emitter: Arc<SnapshotEmitter>,
    stats: Arc<PipelineStats>,
    every: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let Some(first_tick) = Instant::now().checked_add(every) else {
        // Beyond the clock's range the timer never fires.
        while stop.changed().await.is_ok() && !*stop.borrow() {}
        return;
    };
    let mut ticker = interval_at(first_tick, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = emitter.run_cycle(false).await {
                    warn!(error = %e, "windows kept for next cycle");
                }
                debug!(stats = ?stats.snapshot(), "pipeline stats");
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
