//! Error taxonomy.
//!
//! Per-event errors ([`NormalizeError`], [`IngestError`]) are recovered by
//! the driver: the event is counted and dropped. [`PipelineError`] covers the
//! per-cycle and process-level failures.

use thiserror::Error;

use crate::types::EventTime;

/// A raw record could not be turned into an [`OrderEvent`](crate::types::OrderEvent).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("unknown order type `{0}`")]
    UnknownOrderType(String),
}

impl NormalizeError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }
}

/// The event is older than `watermark - allowed_lateness` and was routed to
/// the dead-letter count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("late event at {timestamp}ms: oldest accepted is {oldest_accepted}ms (watermark {watermark}ms)")]
pub struct LateEvent {
    pub timestamp: EventTime,
    pub watermark: EventTime,
    pub oldest_accepted: EventTime,
}

/// Folding the event would overflow a window's running totals. Nothing was
/// merged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invoice {invoice_id} would overflow the window totals")]
pub struct AggregateOverflow {
    pub invoice_id: String,
}

/// Why the aggregator refused an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error(transparent)]
    Late(#[from] LateEvent),
    #[error(transparent)]
    Overflow(#[from] AggregateOverflow),
}

/// Failures that end an emission cycle or the whole stream.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Retries against the sink were exhausted; the window stays in the store.
    #[error("sink write failed for {location} after {attempts} attempt(s): {reason}")]
    SinkWriteFailure {
        location: String,
        attempts: usize,
        reason: String,
    },
    /// The ingestion source is gone. Fatal.
    #[error("source connection lost ({endpoint}): {reason}")]
    SourceConnectionLost { endpoint: String, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The aggregation task died; events past that point were not counted.
    #[error("aggregation task failed: {0}")]
    AggregationFailed(String),
}

impl PipelineError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::SinkWriteFailure { .. } => 1,
            PipelineError::SourceConnectionLost { .. } => 2,
            PipelineError::InvalidConfig(_) => 3,
            PipelineError::AggregationFailed(_) => 4,
        }
    }
}
