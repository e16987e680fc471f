use super::*;

/// Fixed-size, non-overlapping event-time windows aligned to multiples of `size`.
///
/// Every accepted event lands in exactly two keys: one time-only, one
/// time-and-country, both over the same window.
#[derive(Debug, Clone)]
pub struct TumblingWindowAssigner {
    size_ms: i64,
    allowed_lateness_ms: i64,
}

impl TumblingWindowAssigner {
    pub fn new(size: Duration, allowed_lateness: Duration) -> Self {
        Self {
            size_ms: duration_millis(size).max(1),
            allowed_lateness_ms: duration_millis(allowed_lateness),
        }
    }

    pub fn size_ms(&self) -> i64 {
        self.size_ms
    }

    pub fn allowed_lateness_ms(&self) -> i64 {
        self.allowed_lateness_ms
    }

    /// The window containing `timestamp`: `floor(timestamp / size) * size`.
    /// Both bounds saturate at the ends of the `i64` range.
    pub fn window_for(&self, timestamp: EventTime) -> TimeWindow {
        let start = timestamp.saturating_sub(timestamp.rem_euclid(self.size_ms));
        TimeWindow::new(start, start.saturating_add(self.size_ms))
    }

    /// Oldest timestamp still accepted under `watermark`.
    pub fn oldest_accepted(&self, watermark: Watermark) -> EventTime {
        watermark.timestamp.saturating_sub(self.allowed_lateness_ms)
    }

    /// Return the keys `event` belongs to, or [`LateEvent`] if it is older
    /// than `watermark - allowed_lateness`. Before the first watermark every
    /// event is accepted.
    pub fn assign(
        &self,
        event: &OrderEvent,
        watermark: Option<Watermark>,
    ) -> Result<[WindowKey; 2], LateEvent> {
        if let Some(watermark) = watermark {
            let oldest_accepted = self.oldest_accepted(watermark);
            if event.timestamp < oldest_accepted {
                return Err(LateEvent {
                    timestamp: event.timestamp,
                    watermark: watermark.timestamp,
                    oldest_accepted,
                });
            }
        }
        let window = self.window_for(event.timestamp);
        Ok([
            WindowKey::time(window),
            WindowKey::time_and_country(window, event.country.clone()),
        ])
    }
}
