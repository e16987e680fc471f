//! # OrderPulse Core
//!
//! Windowed KPI aggregation for e-commerce order streams.
//!
//! Raw payloads are decoded and validated into [`OrderEvent`](types::OrderEvent)s,
//! assigned to tumbling windows under a bounded-lateness watermark, folded into
//! per-window accumulators for two groupings (time, time and country), and
//! periodically emitted as [`KpiSnapshot`](kpi::KpiSnapshot)s to an append-only
//! sink.
//!
//! - [`types`] — [`OrderEvent`](types::OrderEvent), [`OrderType`](types::OrderType), event time.
//! - [`normalize`] — payload decoding and record validation.
//! - [`window`] — [`TumblingWindowAssigner`](window::TumblingWindowAssigner),
//!   [`WindowKey`](window::WindowKey), watermarks.
//! - [`store`] — [`Accumulator`](store::Accumulator) and [`AggregateStore`](store::AggregateStore).
//! - [`engine`] — [`WindowedAggregator`](engine::WindowedAggregator), the shared ingest state.
//! - [`kpi`] — accumulator to snapshot.
//! - [`emitter`] — [`SnapshotEmitter`](emitter::SnapshotEmitter) cycles.
//! - [`sink`] — [`SnapshotSink`](sink::SnapshotSink) and its filesystem and in-memory backends.
//! - [`source`] — [`EventSource`](source::EventSource) and line-oriented sources.
//! - [`driver`] — [`StreamDriver`](driver::StreamDriver), the task wiring.
//! - [`config`], [`retry`], [`stats`], [`error`].

pub mod config;
pub mod driver;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod kpi;
pub mod normalize;
pub mod retry;
pub mod sink;
pub mod source;
pub mod stats;
pub mod store;
pub mod types;
pub mod window;

pub use config::PipelineConfig;
pub use driver::{DriverReport, StreamDriver};
pub use error::PipelineError;
