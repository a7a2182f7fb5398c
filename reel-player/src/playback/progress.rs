//! Watch-time thresholds for "continue watching"

use reel_common::config::WatchConfig;
use reel_common::events::WatchSurface;
use reel_common::model::SeriesId;
use std::collections::HashSet;
use std::time::Duration;

/// Decides when a series has been watched long enough to be remembered
///
/// Each series is reported at most once.
#[derive(Debug, Clone)]
pub struct WatchProgress {
    feed_threshold: Duration,
    detail_threshold: Duration,
    recorded: HashSet<SeriesId>,
}

impl WatchProgress {
    pub fn new(feed_threshold: Duration, detail_threshold: Duration) -> Self {
        Self {
            feed_threshold,
            detail_threshold,
            recorded: HashSet::new(),
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(config.feed_threshold(), config.detail_threshold())
    }

    pub fn threshold(&self, surface: WatchSurface) -> Duration {
        match surface {
            WatchSurface::Feed => self.feed_threshold,
            WatchSurface::Detail => self.detail_threshold,
        }
    }

    /// Treat these series as already remembered
    pub fn mark_recorded(&mut self, ids: impl IntoIterator<Item = SeriesId>) {
        self.recorded.extend(ids);
    }

    /// Feed a playback position; true the first time the threshold is met
    pub fn observe(
        &mut self,
        surface: WatchSurface,
        series_id: SeriesId,
        position: Duration,
    ) -> bool {
        position >= self.threshold(surface) && self.recorded.insert(series_id)
    }

    pub fn is_recorded(&self, series_id: SeriesId) -> bool {
        self.recorded.contains(&series_id)
    }
}
