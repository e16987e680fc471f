use super::*;

/// Watermark: no events older than this are expected any more.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark {
    pub timestamp: EventTime,
}

impl Watermark {
    pub fn new(timestamp: EventTime) -> Self {
        Self { timestamp }
    }
}

impl std::fmt::Display for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Watermark({}ms)", self.timestamp)
    }
}

/// Watermark generator for streams that arrive out of order by at most
/// `allowed_lateness`.
///
/// The watermark is `max_seen_timestamp - allowed_lateness`. It only moves
/// forward: an older event never pulls it back.
#[derive(Debug, Clone)]
pub struct BoundedLatenessWatermark {
    allowed_lateness_ms: i64,
    max_seen_timestamp: EventTime,
}

impl BoundedLatenessWatermark {
    pub fn new(allowed_lateness: Duration) -> Self {
        Self {
            allowed_lateness_ms: duration_millis(allowed_lateness),
            max_seen_timestamp: EVENT_TIME_MIN,
        }
    }

    /// Notify the generator that an event with the given timestamp was accepted.
    pub fn on_event(&mut self, timestamp: EventTime) {
        if timestamp > self.max_seen_timestamp {
            self.max_seen_timestamp = timestamp;
        }
    }

    /// Current watermark, or `None` before the first event.
    pub fn current(&self) -> Option<Watermark> {
        if self.max_seen_timestamp == EVENT_TIME_MIN {
            return None;
        }
        Some(Watermark::new(
            self.max_seen_timestamp
                .saturating_sub(self.allowed_lateness_ms),
        ))
    }
}
