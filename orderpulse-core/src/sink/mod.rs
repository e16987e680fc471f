//! # Output sinks
//!
//! Append-only destinations for KPI snapshots. Every append creates a new
//! object; nothing is overwritten, so a retried emission may leave a
//! duplicate behind and readers must tolerate that.
//!
//! - [`FsSnapshotSink`] — JSON Lines files under a base directory.
//! - [`InMemorySnapshotSink`] — for tests and embedding, with fault injection.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::kpi::KpiSnapshot;
use crate::types::EventTime;
use crate::window::{Grouping, WindowKey};

mod fs;
mod memory;

pub use fs::*;
pub use memory::*;

/// The snapshots of one window, written as one object.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotBatch {
    pub key: WindowKey,
    /// Processing time of the emission cycle.
    pub emitted_at: EventTime,
    /// Zero-based retry attempt within the cycle.
    pub attempt: usize,
    pub records: Vec<KpiSnapshot>,
}

impl SnapshotBatch {
    pub fn grouping(&self) -> Grouping {
        self.key.grouping()
    }

    /// `<window_start>[_<country>]_<emitted_at>_<attempt>.json`
    pub fn object_name(&self) -> String {
        match &self.key.country {
            Some(country) => format!(
                "{}_{}_{}_{}.json",
                self.key.window_start(),
                escape_segment(country),
                self.emitted_at,
                self.attempt
            ),
            None => format!(
                "{}_{}_{}.json",
                self.key.window_start(),
                self.emitted_at,
                self.attempt
            ),
        }
    }

    /// JSON Lines: one snapshot per line.
    pub fn to_json_lines(&self) -> Result<String> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record).context("serialize kpi snapshot failed")?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Escape every byte other than ASCII alphanumerics and `-` as `%XX`, so
/// distinct countries always map to distinct file names.
fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Destination for emitted snapshots.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Append one batch as a new object and return where it landed.
    async fn append(&self, batch: &SnapshotBatch) -> Result<String>;
}

#[cfg(test)]
#[path = "tests/sink_tests.rs"]
mod tests;
