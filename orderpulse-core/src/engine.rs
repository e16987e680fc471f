//! Watermark, window assignment and aggregate state behind one owner.
//!
//! The ingestion path and the emission path share a single
//! [`WindowedAggregator`] through [`SharedAggregator`]. Lateness check,
//! watermark advance and merge happen under one lock acquisition, and the
//! watermark never moves backwards, so a window reported by
//! [`closed_windows`](WindowedAggregator::closed_windows) can no longer
//! receive merges. That makes it safe to release the lock during sink I/O and
//! evict afterwards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::IngestError;
use crate::store::{Accumulator, AggregateStore};
use crate::types::OrderEvent;
use crate::window::{BoundedLatenessWatermark, TumblingWindowAssigner, Watermark, WindowKey};

/// Aggregator shared by the driver's tasks.
pub type SharedAggregator = Arc<Mutex<WindowedAggregator>>;

/// Lock the shared aggregator. A poisoned lock is recovered: the state is
/// plain data and every mutation leaves it consistent.
pub fn lock(shared: &SharedAggregator) -> MutexGuard<'_, WindowedAggregator> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub struct WindowedAggregator {
    assigner: TumblingWindowAssigner,
    watermark: BoundedLatenessWatermark,
    store: AggregateStore,
}

impl WindowedAggregator {
    pub fn new(window_size: Duration, allowed_lateness: Duration) -> Self {
        Self {
            assigner: TumblingWindowAssigner::new(window_size, allowed_lateness),
            watermark: BoundedLatenessWatermark::new(allowed_lateness),
            store: AggregateStore::new(allowed_lateness),
        }
    }

    pub fn into_shared(self) -> SharedAggregator {
        Arc::new(Mutex::new(self))
    }

    /// Assign `event` to its windows and merge it into both groupings, or
    /// reject it as late or overflowing. A rejected event leaves the
    /// watermark and every accumulator untouched.
    pub fn ingest(&mut self, event: &OrderEvent) -> Result<(), IngestError> {
        let keys = self.assigner.assign(event, self.watermark.current())?;
        self.store.merge(&keys, event)?;
        self.watermark.on_event(event.timestamp);
        Ok(())
    }

    pub fn watermark(&self) -> Option<Watermark> {
        self.watermark.current()
    }

    /// Windows eligible for emission under the current watermark.
    pub fn closed_windows(&self) -> Vec<WindowKey> {
        match self.watermark.current() {
            Some(watermark) => self.store.closed_windows(watermark),
            None => Vec::new(),
        }
    }

    /// Every open window, closed or not. Used for the final forced flush.
    pub fn pending_windows(&self) -> Vec<WindowKey> {
        self.store.pending_windows()
    }

    pub fn accumulator(&self, key: &WindowKey) -> Option<&Accumulator> {
        self.store.get(key)
    }

    pub fn evict(&mut self, key: &WindowKey) -> Option<Accumulator> {
        self.store.evict(key)
    }

    pub fn store(&self) -> &AggregateStore {
        &self.store
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
