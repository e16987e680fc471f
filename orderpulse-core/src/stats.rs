//! Pipeline counters shared between the ingestion and emission paths.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free counters. Updated with relaxed ordering; readers only need
/// eventually consistent totals.
#[derive(Debug, Default)]
pub struct PipelineStats {
    payloads_received: AtomicU64,
    events_accepted: AtomicU64,
    malformed_records: AtomicU64,
    unknown_order_types: AtomicU64,
    late_events: AtomicU64,
    overflowed_events: AtomicU64,
    snapshots_emitted: AtomicU64,
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub payloads_received: u64,
    pub events_accepted: u64,
    pub malformed_records: u64,
    pub unknown_order_types: u64,
    /// Dead-letter count.
    pub late_events: u64,
    /// Would have overflowed a window's totals.
    pub overflowed_events: u64,
    pub snapshots_emitted: u64,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
}

impl StatsSnapshot {
    /// Events dropped for any reason.
    pub fn dropped(&self) -> u64 {
        self.malformed_records
            + self.unknown_order_types
            + self.late_events
            + self.overflowed_events
    }
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_payload(&self) {
        self.payloads_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.events_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown_order_type(&self) {
        self.unknown_order_types.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_late(&self) {
        self.late_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflow(&self) {
        self.overflowed_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshots(&self, n: u64) {
        self.snapshots_emitted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_cycle(&self, ok: bool) {
        if ok {
            self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cycles_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            payloads_received: self.payloads_received.load(Ordering::Relaxed),
            events_accepted: self.events_accepted.load(Ordering::Relaxed),
            malformed_records: self.malformed_records.load(Ordering::Relaxed),
            unknown_order_types: self.unknown_order_types.load(Ordering::Relaxed),
            late_events: self.late_events.load(Ordering::Relaxed),
            overflowed_events: self.overflowed_events.load(Ordering::Relaxed),
            snapshots_emitted: self.snapshots_emitted.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
        }
    }
}
