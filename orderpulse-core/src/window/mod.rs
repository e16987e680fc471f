//! # Windowing
//!
//! Tumbling event-time windows, the lateness-bounded watermark, and the keys
//! that address the two aggregate groupings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LateEvent;
use crate::types::{duration_millis, EventTime, OrderEvent, EVENT_TIME_MIN};

mod assigner;
mod key;
mod watermark;

pub use assigner::*;
pub use key::*;
pub use watermark::*;

#[cfg(test)]
#[path = "tests/window_tests.rs"]
mod tests;
