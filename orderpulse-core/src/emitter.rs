//! Periodic snapshot emission.
//!
//! One cycle walks `Idle -> Collecting -> Writing -> Idle`:
//! closed windows are read and turned into snapshots under the aggregator
//! lock, the lock is released, each batch is appended to the sink with retry,
//! and a window is evicted only after its append succeeded. If retries run
//! out the cycle stops there and every unwritten window stays in the store for
//! the next cycle.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::engine::{lock, SharedAggregator};
use crate::error::PipelineError;
use crate::kpi::compute;
use crate::retry::RetryPolicy;
use crate::sink::{SnapshotBatch, SnapshotSink};
use crate::stats::PipelineStats;
use crate::types::now_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmitterPhase {
    Idle,
    Collecting,
    Writing,
}

/// Outcome of a successful cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub forced: bool,
    /// Windows written and evicted.
    pub emitted: usize,
    pub locations: Vec<String>,
}

pub struct SnapshotEmitter {
    aggregator: SharedAggregator,
    sink: Arc<dyn SnapshotSink>,
    retry: RetryPolicy,
    stats: Arc<PipelineStats>,
    phase: Mutex<EmitterPhase>,
    // Serializes cycles; holds the last cycle number.
    cycles: tokio::sync::Mutex<u64>,
}

impl SnapshotEmitter {
    pub fn new(
        aggregator: SharedAggregator,
        sink: Arc<dyn SnapshotSink>,
        retry: RetryPolicy,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            aggregator,
            sink,
            retry: retry.clamped(),
            stats,
            phase: Mutex::new(EmitterPhase::Idle),
            cycles: tokio::sync::Mutex::new(0),
        }
    }

    pub fn phase(&self) -> EmitterPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: EmitterPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    /// Run one emission cycle. With `force`, every pending window is emitted
    /// regardless of the watermark; only call it once ingestion has stopped.
    pub async fn run_cycle(&self, force: bool) -> Result<CycleReport, PipelineError> {
        let mut cycles = self.cycles.lock().await;
        *cycles += 1;
        let cycle = *cycles;

        self.set_phase(EmitterPhase::Collecting);
        let batches = self.collect(force);
        debug!(cycle, force, windows = batches.len(), "collected windows");

        self.set_phase(EmitterPhase::Writing);
        let result = self.write(cycle, force, batches).await;
        self.set_phase(EmitterPhase::Idle);

        self.stats.record_cycle(result.is_ok());
        match &result {
            Ok(report) => info!(cycle, force, emitted = report.emitted, "emission cycle completed"),
            Err(e) => error!(cycle, force, error = %e, "emission cycle failed"),
        }
        result
    }

    fn collect(&self, force: bool) -> Vec<SnapshotBatch> {
        let emitted_at = now_millis();
        let aggregator = lock(&self.aggregator);
        let keys = if force {
            aggregator.pending_windows()
        } else {
            aggregator.closed_windows()
        };
        keys.into_iter()
            .filter_map(|key| {
                let snapshot = compute(&key, aggregator.accumulator(&key)?);
                Some(SnapshotBatch {
                    key,
                    emitted_at,
                    attempt: 0,
                    records: vec![snapshot],
                })
            })
            .collect()
    }

    async fn write(
        &self,
        cycle: u64,
        forced: bool,
        batches: Vec<SnapshotBatch>,
    ) -> Result<CycleReport, PipelineError> {
        let mut locations = Vec::with_capacity(batches.len());
        for batch in batches {
            let outcome = self
                .retry
                .retry_async(|attempt| {
                    if attempt > 0 {
                        warn!(window = %batch.key, attempt, "retrying snapshot append");
                    }
                    let sink = Arc::clone(&self.sink);
                    let batch = SnapshotBatch {
                        attempt,
                        ..batch.clone()
                    };
                    async move { sink.append(&batch).await }
                })
                .await;

            match outcome {
                Ok(location) => {
                    lock(&self.aggregator).evict(&batch.key);
                    self.stats.record_snapshots(batch.records.len() as u64);
                    debug!(window = %batch.key, %location, "snapshot written");
                    locations.push(location);
                }
                Err((err, attempts)) => {
                    return Err(PipelineError::SinkWriteFailure {
                        location: format!("{}/{}", batch.grouping().partition(), batch.key),
                        attempts,
                        reason: format!("{:#}", err),
                    });
                }
            }
        }
        Ok(CycleReport {
            cycle,
            forced,
            emitted: locations.len(),
            locations,
        })
    }
}

#[cfg(test)]
#[path = "tests/emitter_tests.rs"]
mod tests;
