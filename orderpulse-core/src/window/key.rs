use super::*;

/// A half-open event-time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: EventTime,
    pub end: EventTime,
}

impl TimeWindow {
    pub fn new(start: EventTime, end: EventTime) -> Self {
        Self { start, end }
    }

    /// Return true if `timestamp` falls inside this window.
    pub fn contains(&self, timestamp: EventTime) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    pub fn size_ms(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Which of the two aggregate mappings a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    Time,
    TimeAndCountry,
}

impl Grouping {
    /// Output partition name for this grouping.
    pub fn partition(self) -> &'static str {
        match self {
            Grouping::Time => "time-based",
            Grouping::TimeAndCountry => "time-and-country-based",
        }
    }
}

/// Identifies one aggregation bucket.
///
/// Ordering is by window first, so a `BTreeMap<WindowKey, _>` iterates in
/// event-time order and closed windows form a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowKey {
    pub window: TimeWindow,
    pub country: Option<String>,
}

impl WindowKey {
    /// Key for the time-only grouping.
    pub fn time(window: TimeWindow) -> Self {
        Self {
            window,
            country: None,
        }
    }

    /// Key for the time-and-country grouping.
    pub fn time_and_country(window: TimeWindow, country: impl Into<String>) -> Self {
        Self {
            window,
            country: Some(country.into()),
        }
    }

    pub fn window_start(&self) -> EventTime {
        self.window.start
    }

    pub fn window_end(&self) -> EventTime {
        self.window.end
    }

    pub fn grouping(&self) -> Grouping {
        if self.country.is_some() {
            Grouping::TimeAndCountry
        } else {
            Grouping::Time
        }
    }
}

impl std::fmt::Display for WindowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.country {
            Some(country) => write!(f, "{}@{}", self.window, country),
            None => write!(f, "{}", self.window),
        }
    }
}
