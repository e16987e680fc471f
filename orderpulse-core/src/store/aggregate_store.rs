use super::*;

/// In-memory aggregate state for the time-only and time-and-country groupings.
///
/// Entries are created by the first event landing in a window, become
/// eligible for emission once `window_end + allowed_lateness <= watermark`,
/// and are removed by [`evict`](Self::evict) after a successful emission.
///
/// Both mappings are `BTreeMap`s ordered by window, so the closed set is a
/// prefix and is found without scanning open windows.
#[derive(Debug, Clone)]
pub struct AggregateStore {
    allowed_lateness_ms: i64,
    time_windows: BTreeMap<WindowKey, Accumulator>,
    country_windows: BTreeMap<WindowKey, Accumulator>,
}

impl AggregateStore {
    pub fn new(allowed_lateness: Duration) -> Self {
        Self {
            allowed_lateness_ms: duration_millis(allowed_lateness),
            time_windows: BTreeMap::new(),
            country_windows: BTreeMap::new(),
        }
    }

    fn windows(&self, grouping: Grouping) -> &BTreeMap<WindowKey, Accumulator> {
        match grouping {
            Grouping::Time => &self.time_windows,
            Grouping::TimeAndCountry => &self.country_windows,
        }
    }

    fn windows_mut(&mut self, grouping: Grouping) -> &mut BTreeMap<WindowKey, Accumulator> {
        match grouping {
            Grouping::Time => &mut self.time_windows,
            Grouping::TimeAndCountry => &mut self.country_windows,
        }
    }

    /// Fold `event` into the accumulator of every key, creating missing ones.
    /// If any accumulator would overflow, none of them is touched.
    ///
    /// No deduplication: a re-delivered event is counted again.
    pub fn merge(
        &mut self,
        keys: &[WindowKey],
        event: &OrderEvent,
    ) -> Result<(), AggregateOverflow> {
        // A fresh accumulator always fits one event.
        for key in keys {
            if let Some(acc) = self.get(key) {
                acc.check(event)?;
            }
        }
        for key in keys {
            self.windows_mut(key.grouping())
                .entry(key.clone())
                .or_default()
                .add(event)?;
        }
        Ok(())
    }

    /// Keys whose `window_end + allowed_lateness <= watermark`, time-only
    /// keys first, each grouping in window order. Read-only.
    pub fn closed_windows(&self, watermark: Watermark) -> Vec<WindowKey> {
        let lateness = self.allowed_lateness_ms;
        let is_closed =
            |key: &&WindowKey| key.window_end().saturating_add(lateness) <= watermark.timestamp;
        self.time_windows
            .keys()
            .take_while(is_closed)
            .chain(self.country_windows.keys().take_while(is_closed))
            .cloned()
            .collect()
    }

    /// Every key currently held, in the same order as [`closed_windows`](Self::closed_windows).
    pub fn pending_windows(&self) -> Vec<WindowKey> {
        self.time_windows
            .keys()
            .chain(self.country_windows.keys())
            .cloned()
            .collect()
    }

    pub fn get(&self, key: &WindowKey) -> Option<&Accumulator> {
        self.windows(key.grouping()).get(key)
    }

    /// Remove a window. Call only after its snapshot was written.
    pub fn evict(&mut self, key: &WindowKey) -> Option<Accumulator> {
        self.windows_mut(key.grouping()).remove(key)
    }

    /// Number of open windows in one grouping.
    pub fn window_count(&self, grouping: Grouping) -> usize {
        self.windows(grouping).len()
    }

    pub fn len(&self) -> usize {
        self.time_windows.len() + self.country_windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
