//! # Aggregate Store
//!
//! Running KPI state per window key, for both groupings.
//!
//! - [`Accumulator`] — incremental aggregate for one window; `O(distinct
//!   invoices)` memory instead of buffering every event.
//! - [`AggregateStore`] — owns the two mappings. All mutation goes through
//!   [`merge`](AggregateStore::merge) and [`evict`](AggregateStore::evict).

use std::collections::BTreeMap;
use std::time::Duration;

use ahash::AHashSet;
use rust_decimal::Decimal;

use crate::error::AggregateOverflow;
use crate::types::{duration_millis, OrderEvent};
use crate::window::{Grouping, Watermark, WindowKey};

mod accumulator;
mod aggregate_store;

pub use accumulator::*;
pub use aggregate_store::*;

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
