//! Feed driver task
//!
//! Owns the [`FeedPlaybackController`] on a single tokio task. UI-side
//! callers talk to it through a cloneable [`FeedHandle`]; media backends
//! talk to it through the readiness channel. Both are drained by one
//! `select!` loop, which is the only place controller state changes.
//!
//! The loop also runs the one-shot playback confirmation timers and a
//! periodic progress check that feeds the "continue watching" list.

use super::backend::ReadinessReport;
use super::controller::FeedPlaybackController;
use super::handle::HandleSnapshot;
use super::progress::WatchProgress;
use super::source::MediaSource;
use super::visibility::{Rect, VisibilityTracker};
use crate::db::ContinueWatchingStore;
use crate::error::{Error, Result};
use reel_common::config::TomlConfig;
use reel_common::events::{
    CellId, CellState, EventBus, HandleId, ReelEvent, VisibilityState, WatchSurface,
};
use reel_common::model::Episode;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const COMMAND_CAPACITY: usize = 64;

/// Driver timing and decoding settings
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Key for episode URL de-obfuscation
    pub url_key: String,
    /// Delay of the "did playback start" check
    pub confirm_delay: Duration,
    /// How often the playing position is sampled for watch progress
    pub progress_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            url_key: String::new(),
            confirm_delay: Duration::from_millis(1000),
            progress_interval: Duration::from_millis(500),
        }
    }
}

impl DriverConfig {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            url_key: config.media.url_key.clone(),
            confirm_delay: config.watch.confirm_delay(),
            ..Default::default()
        }
    }
}

/// Counters for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub cached: usize,
    pub live: usize,
    pub audible: usize,
    pub active: Option<HandleId>,
}

/// Requests handled by the driver task
#[derive(Debug)]
pub enum FeedCommand {
    Bind {
        cell: CellId,
        source: MediaSource,
        reply: oneshot::Sender<HandleId>,
    },
    BindEpisode {
        cell: CellId,
        episode: Box<Episode>,
        reply: oneshot::Sender<Option<HandleId>>,
    },
    Visibility {
        cell: CellId,
        state: VisibilityState,
        reply: oneshot::Sender<()>,
    },
    /// New scroll position: classify every frame and apply the changes
    Layout {
        viewport: Rect,
        frames: Vec<(CellId, Rect)>,
        reply: oneshot::Sender<Vec<(CellId, VisibilityState)>>,
    },
    Toggle {
        cell: CellId,
        reply: oneshot::Sender<()>,
    },
    Reuse {
        cell: CellId,
        reply: oneshot::Sender<()>,
    },
    SetSurface {
        cell: CellId,
        surface: WatchSurface,
        reply: oneshot::Sender<()>,
    },
    SilenceAll {
        reply: oneshot::Sender<usize>,
    },
    CellState {
        cell: CellId,
        reply: oneshot::Sender<CellState>,
    },
    Snapshot {
        cell: CellId,
        reply: oneshot::Sender<Option<HandleSnapshot>>,
    },
    Stats {
        reply: oneshot::Sender<FeedStats>,
    },
    Teardown {
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Cloneable client of a running [`FeedDriver`]
#[derive(Debug, Clone)]
pub struct FeedHandle {
    tx: mpsc::Sender<FeedCommand>,
}

impl FeedHandle {
    pub async fn bind(&self, cell: CellId, source: MediaSource) -> Result<HandleId> {
        self.request(|reply| FeedCommand::Bind {
            cell,
            source,
            reply,
        })
        .await
    }

    /// Bind an episode; `None` when its media URL is unusable
    pub async fn bind_episode(&self, cell: CellId, episode: Episode) -> Result<Option<HandleId>> {
        self.request(|reply| FeedCommand::BindEpisode {
            cell,
            episode: Box::new(episode),
            reply,
        })
        .await
    }

    pub async fn visibility(&self, cell: CellId, state: VisibilityState) -> Result<()> {
        self.request(|reply| FeedCommand::Visibility { cell, state, reply })
            .await
    }

    /// Report frames after a scroll; returns the visibility changes applied
    pub async fn layout(
        &self,
        viewport: Rect,
        frames: Vec<(CellId, Rect)>,
    ) -> Result<Vec<(CellId, VisibilityState)>> {
        self.request(|reply| FeedCommand::Layout {
            viewport,
            frames,
            reply,
        })
        .await
    }

    pub async fn toggle(&self, cell: CellId) -> Result<()> {
        self.request(|reply| FeedCommand::Toggle { cell, reply })
            .await
    }

    pub async fn reuse(&self, cell: CellId) -> Result<()> {
        self.request(|reply| FeedCommand::Reuse { cell, reply })
            .await
    }

    /// Which watch threshold applies to `cell` (feed by default)
    pub async fn set_surface(&self, cell: CellId, surface: WatchSurface) -> Result<()> {
        self.request(|reply| FeedCommand::SetSurface {
            cell,
            surface,
            reply,
        })
        .await
    }

    pub async fn silence_all(&self) -> Result<usize> {
        self.request(|reply| FeedCommand::SilenceAll { reply }).await
    }

    pub async fn cell_state(&self, cell: CellId) -> Result<CellState> {
        self.request(|reply| FeedCommand::CellState { cell, reply })
            .await
    }

    pub async fn snapshot(&self, cell: CellId) -> Result<Option<HandleSnapshot>> {
        self.request(|reply| FeedCommand::Snapshot { cell, reply })
            .await
    }

    pub async fn stats(&self) -> Result<FeedStats> {
        self.request(|reply| FeedCommand::Stats { reply }).await
    }

    pub async fn teardown(&self) -> Result<usize> {
        self.request(|reply| FeedCommand::Teardown { reply }).await
    }

    /// Ask the driver to release everything and exit
    pub async fn shutdown(&self) {
        if self.tx.send(FeedCommand::Shutdown).await.is_err() {
            debug!("Feed driver already stopped");
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> FeedCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| Error::DriverGone("command channel closed".to_string()))?;
        rx.await
            .map_err(|_| Error::DriverGone("driver dropped the request".to_string()))
    }
}

/// Single owner of the feed controller
pub struct FeedDriver {
    controller: FeedPlaybackController,
    readiness_rx: mpsc::UnboundedReceiver<ReadinessReport>,
    confirm_tx: mpsc::UnboundedSender<HandleId>,
    confirm_rx: mpsc::UnboundedReceiver<HandleId>,
    tracker: VisibilityTracker,
    surfaces: HashMap<CellId, WatchSurface>,
    progress: Option<WatchProgress>,
    store: Option<ContinueWatchingStore>,
    events: EventBus,
    config: DriverConfig,
}

impl FeedDriver {
    pub fn new(
        controller: FeedPlaybackController,
        readiness_rx: mpsc::UnboundedReceiver<ReadinessReport>,
        events: EventBus,
        config: DriverConfig,
    ) -> Self {
        let (confirm_tx, confirm_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            readiness_rx,
            confirm_tx,
            confirm_rx,
            tracker: VisibilityTracker::new(),
            surfaces: HashMap::new(),
            progress: None,
            store: None,
            events,
            config,
        }
    }

    /// Track watch progress, persisting crossings to `store` when given
    pub fn with_progress(
        mut self,
        mut progress: WatchProgress,
        store: Option<ContinueWatchingStore>,
    ) -> Self {
        if let Some(store) = &store {
            progress.mark_recorded(store.ids().iter().copied());
        }
        self.progress = Some(progress);
        self.store = store;
        self
    }

    /// Start the task
    pub fn spawn(self) -> (FeedHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let task = tokio::spawn(self.run(rx));
        (FeedHandle { tx }, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<FeedCommand>) {
        info!("Feed driver started");
        let mut ticker = tokio::time::interval(self.config.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                Some(report) = self.readiness_rx.recv() => {
                    self.controller.handle_readiness(report);
                }
                Some(handle_id) = self.confirm_rx.recv() => {
                    self.controller.confirm_playback(handle_id);
                }
                command = commands.recv() => match command {
                    Some(FeedCommand::Shutdown) | None => break,
                    Some(command) => self.dispatch(command),
                },
                _ = ticker.tick() => {
                    self.check_progress().await;
                }
            }

            self.schedule_confirmations();
        }

        self.controller.teardown();
        info!("Feed driver stopped");
    }

    fn dispatch(&mut self, command: FeedCommand) {
        match command {
            FeedCommand::Bind {
                cell,
                source,
                reply,
            } => {
                let previous = self.controller.handle_for(cell);
                let id = self.controller.bind(cell, source);
                self.forget_if_rebound(cell, previous);
                let _ = reply.send(id);
            }
            FeedCommand::BindEpisode {
                cell,
                episode,
                reply,
            } => {
                let previous = self.controller.handle_for(cell);
                let id = self
                    .controller
                    .bind_episode(cell, &episode, &self.config.url_key);
                self.forget_if_rebound(cell, previous);
                let _ = reply.send(id);
            }
            FeedCommand::Visibility { cell, state, reply } => {
                self.controller.on_visibility_changed(cell, state);
                let _ = reply.send(());
            }
            FeedCommand::Layout {
                viewport,
                frames,
                reply,
            } => {
                let changes = self.tracker.update(&viewport, &frames);
                for (cell, state) in &changes {
                    self.controller.on_visibility_changed(*cell, *state);
                }
                let _ = reply.send(changes);
            }
            FeedCommand::Toggle { cell, reply } => {
                self.controller.user_toggled_playback(cell);
                let _ = reply.send(());
            }
            FeedCommand::Reuse { cell, reply } => {
                self.controller.prepare_for_reuse(cell);
                self.tracker.forget(cell);
                self.surfaces.remove(&cell);
                let _ = reply.send(());
            }
            FeedCommand::SetSurface {
                cell,
                surface,
                reply,
            } => {
                match surface {
                    WatchSurface::Feed => self.surfaces.remove(&cell),
                    WatchSurface::Detail => self.surfaces.insert(cell, surface),
                };
                let _ = reply.send(());
            }
            FeedCommand::SilenceAll { reply } => {
                let _ = reply.send(self.controller.silence_all());
            }
            FeedCommand::CellState { cell, reply } => {
                let _ = reply.send(self.controller.cell_state(cell));
            }
            FeedCommand::Snapshot { cell, reply } => {
                let _ = reply.send(self.controller.cell_snapshot(cell));
            }
            FeedCommand::Stats { reply } => {
                let _ = reply.send(FeedStats {
                    cached: self.controller.cached_count(),
                    live: self.controller.live_count(),
                    audible: self.controller.audible_count(),
                    active: self.controller.active_handle(),
                });
            }
            FeedCommand::Teardown { reply } => {
                self.tracker = VisibilityTracker::new();
                self.surfaces.clear();
                let _ = reply.send(self.controller.teardown());
            }
            FeedCommand::Shutdown => {}
        }
    }

    /// A cell now showing different content must report visibility afresh
    fn forget_if_rebound(&mut self, cell: CellId, previous: Option<HandleId>) {
        if previous.is_some() && self.controller.handle_for(cell) != previous {
            debug!(cell = %cell, "Cell rebound, visibility reset");
            self.tracker.forget(cell);
        }
    }

    fn schedule_confirmations(&mut self) {
        for handle_id in self.controller.take_confirmations() {
            let tx = self.confirm_tx.clone();
            let delay = self.config.confirm_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(handle_id);
            });
        }
    }

    async fn check_progress(&mut self) {
        let Some(progress) = self.progress.as_mut() else {
            return;
        };
        let Some(active) = self.controller.active_playback() else {
            return;
        };

        let surface = active
            .cell
            .and_then(|cell| self.surfaces.get(&cell).copied())
            .unwrap_or(WatchSurface::Feed);
        if !progress.observe(surface, active.series_id, active.position) {
            return;
        }

        info!(series_id = active.series_id, %surface, "Watch threshold reached");
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.append(active.series_id).await {
                warn!(
                    series_id = active.series_id,
                    error = %e,
                    "Failed to save continue-watching list"
                );
            }
        }
        self.events.emit_lossy(ReelEvent::ContinueWatchingAdded {
            series_id: active.series_id,
            surface,
            timestamp: chrono::Utc::now(),
        });
    }
}
