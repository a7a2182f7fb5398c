//! In-process media backend
//!
//! Stands in for a platform media framework in the CLI and in tests. Each
//! opened player is recorded in a shared registry so callers can inspect
//! it and drive its clock through [`SimulatedControls`] after the backend
//! itself has been moved into a controller.

use super::backend::{MediaBackend, MediaPlayer, ReadinessNotifier};
use super::source::MediaSource;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// How opened players report readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBehavior {
    /// Report ready from inside `open`
    Immediate,
    /// Never report on its own; use [`SimulatedControls::notify_ready`]
    Manual,
}

#[derive(Debug)]
struct SimPlayerState {
    url: String,
    playing: bool,
    volume: f32,
    base_position: Duration,
    started_at: Option<Instant>,
    surface_attached: bool,
    stalled: bool,
    notifier: ReadinessNotifier,
}

impl SimPlayerState {
    fn position(&self, realtime: bool) -> Duration {
        match (realtime, self.started_at) {
            (true, Some(at)) if !self.stalled => self.base_position + at.elapsed(),
            _ => self.base_position,
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    players: Vec<Arc<Mutex<SimPlayerState>>>,
    failing: HashSet<String>,
    realtime: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Backend producing [`SimulatedPlayer`]s
#[derive(Debug)]
pub struct SimulatedBackend {
    behavior: LoadBehavior,
    registry: Arc<Mutex<Registry>>,
}

impl SimulatedBackend {
    pub fn new(behavior: LoadBehavior) -> Self {
        Self {
            behavior,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    /// Advance positions with wall-clock time while playing
    pub fn realtime(self) -> Self {
        lock(&self.registry).realtime = true;
        self
    }

    /// Handle for inspecting and driving opened players
    pub fn controls(&self) -> SimulatedControls {
        SimulatedControls {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl MediaBackend for SimulatedBackend {
    fn open(&mut self, source: &MediaSource, notifier: ReadinessNotifier) -> Box<dyn MediaPlayer> {
        let (fails, realtime) = {
            let registry = lock(&self.registry);
            (registry.failing.contains(source.url()), registry.realtime)
        };

        let state = Arc::new(Mutex::new(SimPlayerState {
            url: source.url().to_string(),
            playing: false,
            volume: 0.0,
            base_position: Duration::ZERO,
            started_at: None,
            surface_attached: true,
            stalled: false,
            notifier: notifier.clone(),
        }));
        lock(&self.registry).players.push(Arc::clone(&state));

        if self.behavior == LoadBehavior::Immediate {
            if fails {
                notifier.failed("simulated load failure");
            } else {
                notifier.ready();
            }
        }

        Box::new(SimulatedPlayer { state, realtime })
    }
}

/// Player created by [`SimulatedBackend`]
#[derive(Debug)]
pub struct SimulatedPlayer {
    state: Arc<Mutex<SimPlayerState>>,
    realtime: bool,
}

impl MediaPlayer for SimulatedPlayer {
    fn play(&mut self) {
        let mut s = lock(&self.state);
        if !s.playing {
            s.playing = true;
            s.started_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        let mut s = lock(&self.state);
        if s.playing {
            s.base_position = s.position(self.realtime);
            s.playing = false;
            s.started_at = None;
        }
    }

    fn set_volume(&mut self, volume: f32) {
        lock(&self.state).volume = volume.clamp(0.0, 1.0);
    }

    fn seek_to_start(&mut self) {
        let mut s = lock(&self.state);
        s.base_position = Duration::ZERO;
        if s.playing {
            s.started_at = Some(Instant::now());
        }
    }

    fn position(&self) -> Duration {
        lock(&self.state).position(self.realtime)
    }

    fn is_advancing(&self) -> bool {
        let s = lock(&self.state);
        s.playing && !s.stalled
    }

    fn attach_surface(&mut self) {
        lock(&self.state).surface_attached = true;
    }

    fn detach_surface(&mut self) {
        lock(&self.state).surface_attached = false;
    }
}

/// Observed state of one simulated player
#[derive(Debug, Clone, PartialEq)]
pub struct SimPlayerView {
    pub url: String,
    pub playing: bool,
    pub volume: f32,
    pub position: Duration,
    pub surface_attached: bool,
}

/// Shared view into a [`SimulatedBackend`]
#[derive(Debug, Clone)]
pub struct SimulatedControls {
    registry: Arc<Mutex<Registry>>,
}

impl SimulatedControls {
    /// Number of players ever opened
    pub fn opened(&self) -> usize {
        lock(&self.registry).players.len()
    }

    /// Number of players ever opened for `url`
    pub fn opened_for(&self, url: &str) -> usize {
        lock(&self.registry)
            .players
            .iter()
            .filter(|p| lock(p).url == url)
            .count()
    }

    /// Make future opens of `url` fail to load
    pub fn fail_url(&self, url: &str) {
        lock(&self.registry).failing.insert(url.to_string());
    }

    /// State of the most recently opened player for `url`
    pub fn latest(&self, url: &str) -> Option<SimPlayerView> {
        let registry = lock(&self.registry);
        let realtime = registry.realtime;
        registry.players.iter().rev().find_map(|p| {
            let s = lock(p);
            (s.url == url).then(|| SimPlayerView {
                url: s.url.clone(),
                playing: s.playing,
                volume: s.volume,
                position: s.position(realtime),
                surface_attached: s.surface_attached,
            })
        })
    }

    /// Move the clock of the latest player for `url` forward
    pub fn advance(&self, url: &str, by: Duration) {
        self.with_latest(url, |s| s.base_position += by);
    }

    /// Freeze the clock of the latest player for `url`
    pub fn stall(&self, url: &str) {
        self.with_latest(url, |s| s.stalled = true);
    }

    /// Report ready for the latest player of `url`
    pub fn notify_ready(&self, url: &str) {
        self.with_latest(url, |s| s.notifier.ready());
    }

    /// Report a load failure for the latest player of `url`
    pub fn notify_failed(&self, url: &str, reason: &str) {
        self.with_latest(url, |s| s.notifier.failed(reason));
    }

    /// Report end of item for the latest player of `url`
    pub fn notify_ended(&self, url: &str) {
        self.with_latest(url, |s| s.notifier.ended());
    }

    fn with_latest(&self, url: &str, f: impl FnOnce(&mut SimPlayerState)) {
        let registry = lock(&self.registry);
        if let Some(p) = registry.players.iter().rev().find(|p| lock(p).url == url) {
            f(&mut lock(p));
        }
    }
}
