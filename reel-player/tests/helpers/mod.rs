//! Shared fixtures for reel-player integration tests
//!
//! - `Feed`: controller on a simulated backend with its readiness channel
//! - builders for sources, episodes and series

#![allow(dead_code)]

use reel_common::events::{EventBus, ReelEvent};
use reel_common::model::{Episode, Series};
use reel_common::obfuscation;
use reel_player::playback::{
    FeedPlaybackController, LoadBehavior, MediaSource, PlayerCache, ReadinessReport,
    SimulatedBackend, SimulatedControls,
};
use tokio::sync::{broadcast, mpsc};

pub const URL_KEY: &str = "reel-test-key";

pub fn url(n: i64) -> String {
    format!("https://cdn.test/series-{}/ep-1.mp4", n)
}

/// Source for series `n`, episode id `n * 10`
pub fn source(n: i64) -> MediaSource {
    MediaSource::new(url(n), n * 10, n).unwrap()
}

pub struct Feed {
    pub controller: FeedPlaybackController,
    pub readiness: mpsc::UnboundedReceiver<ReadinessReport>,
    pub controls: SimulatedControls,
    pub events: broadcast::Receiver<ReelEvent>,
}

impl Feed {
    pub fn new(behavior: LoadBehavior) -> Self {
        let backend = SimulatedBackend::new(behavior);
        let controls = backend.controls();
        let bus = EventBus::new(256);
        let events = bus.subscribe();
        let (controller, readiness) =
            FeedPlaybackController::new(PlayerCache::new(), Box::new(backend), bus);
        Self {
            controller,
            readiness,
            controls,
            events,
        }
    }

    /// Players report ready as soon as they are opened
    pub fn immediate() -> Self {
        Self::new(LoadBehavior::Immediate)
    }

    /// Players stay loading until the test says otherwise
    pub fn manual() -> Self {
        Self::new(LoadBehavior::Manual)
    }

    /// Apply every queued readiness report
    pub fn pump(&mut self) {
        while let Ok(report) = self.readiness.try_recv() {
            self.controller.handle_readiness(report);
        }
    }

    /// Take every queued report without applying it
    pub fn take_reports(&mut self) -> Vec<ReadinessReport> {
        let mut reports = Vec::new();
        while let Ok(report) = self.readiness.try_recv() {
            reports.push(report);
        }
        reports
    }

    pub fn drain_events(&mut self) -> Vec<ReelEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

pub fn episode(
    id: i64,
    series_id: i64,
    number: u32,
    is_free: bool,
    media_url: Option<&str>,
) -> Episode {
    Episode {
        id,
        series_id,
        episode: number,
        price: if is_free { 0 } else { 40 },
        is_free,
        is_available: true,
        total_likes: 0,
        is_liked: None,
        media_blob: media_url.map(|u| obfuscation::conceal(u, URL_KEY).unwrap()),
    }
}

pub fn series(id: i64, title: &str, total_episodes: u32) -> Series {
    Series {
        id,
        pos: None,
        title: title.to_string(),
        description: String::new(),
        cover: format!("https://cdn.test/covers/{}.jpg", id),
        category_id: 1,
        tag_id: 1,
        total_episodes,
        is_auto_unlock: false,
        is_favourite: false,
    }
}
