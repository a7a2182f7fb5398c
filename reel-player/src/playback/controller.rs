//! Feed playback controller
//!
//! Enforces the single-active-video policy and manages player lifecycle as
//! feed cells scroll in and out and get recycled. All operations are
//! synchronous and run on the owner task (see [`super::driver`]); backend
//! readiness arrives as [`ReadinessReport`]s on the channel returned by
//! [`FeedPlaybackController::new`] and is applied with
//! [`FeedPlaybackController::handle_readiness`].
//!
//! Nothing here returns an error to the caller. Media failures are logged,
//! emitted on the [`EventBus`] and leave the affected cell paused.

use super::backend::{MediaBackend, MediaEvent, ReadinessNotifier, ReadinessReport};
use super::cache::PlayerCache;
use super::handle::{HandleSnapshot, PlayerHandle};
use super::source::MediaSource;
use reel_common::events::{
    CellId, CellState, EventBus, HandleId, PlaybackState, Readiness, ReelEvent, VisibilityState,
};
use reel_common::model::{Episode, EpisodeId, SeriesId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Progress of whatever is currently playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePlayback {
    pub handle_id: HandleId,
    /// Cell that last asked the handle to play, if it still shows it
    pub cell: Option<CellId>,
    pub series_id: SeriesId,
    pub position: Duration,
}

pub struct FeedPlaybackController {
    cache: PlayerCache,
    backend: Box<dyn MediaBackend>,
    events: EventBus,
    cells: HashMap<CellId, HandleId>,
    /// Handle the user (or visibility) last asked to play
    active: Option<HandleId>,
    /// Cell whose request made `active` the playing handle
    active_cell: Option<CellId>,
    readiness_tx: mpsc::UnboundedSender<ReadinessReport>,
    /// Handles started since the last `take_confirmations`
    pending_confirmations: Vec<HandleId>,
}

impl FeedPlaybackController {
    /// Create a controller around an injected cache and backend
    ///
    /// The returned receiver carries backend readiness reports; the owner
    /// must feed them back through `handle_readiness`.
    pub fn new(
        cache: PlayerCache,
        backend: Box<dyn MediaBackend>,
        events: EventBus,
    ) -> (Self, mpsc::UnboundedReceiver<ReadinessReport>) {
        let (readiness_tx, readiness_rx) = mpsc::unbounded_channel();
        let controller = Self {
            cache,
            backend,
            events,
            cells: HashMap::new(),
            active: None,
            active_cell: None,
            readiness_tx,
            pending_confirmations: Vec::new(),
        };
        (controller, readiness_rx)
    }

    /// Associate a cell with a media source
    ///
    /// Reuses the cached handle for the source if there is one, otherwise
    /// opens a new muted, stopped handle and starts loading it. Never starts
    /// playback. Rebinding a cell to the source it already shows is a no-op;
    /// rebinding it to a different source recycles the cell first.
    pub fn bind(&mut self, cell: CellId, source: MediaSource) -> HandleId {
        if let Some(current) = self.cells.get(&cell).copied() {
            let same = self
                .cache
                .get(current)
                .map(|h| h.source().key() == source.key())
                .unwrap_or(false);
            if same {
                debug!(cell = %cell, handle = %current, "Cell already bound to source");
                return current;
            }
            self.prepare_for_reuse(cell);
        }

        let id = match self.cache.lookup(source.key()) {
            Some(id) => {
                debug!(cell = %cell, handle = %id, url = %source.url(), "Reusing cached player");
                id
            }
            None => self.open_handle(source),
        };

        if let Some(handle) = self.cache.get_mut(id) {
            handle.add_holder();
        }
        self.cells.insert(cell, id);
        id
    }

    /// Decode an episode's media URL and bind it
    ///
    /// An episode whose URL is missing or fails to decode gets no handle:
    /// the failure is logged and emitted, and the cell ends up unbound.
    pub fn bind_episode(
        &mut self,
        cell: CellId,
        episode: &Episode,
        url_key: &str,
    ) -> Option<HandleId> {
        match MediaSource::from_episode(episode, url_key) {
            Ok(source) => Some(self.bind(cell, source)),
            Err(e) => {
                warn!(
                    cell = %cell,
                    episode_id = episode.id,
                    error = %e,
                    "Episode media not playable"
                );
                self.prepare_for_reuse(cell);
                self.events.emit_lossy(ReelEvent::MediaNotPlayable {
                    handle_id: None,
                    episode_id: episode.id,
                    reason: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                None
            }
        }
    }

    /// React to a cell's visibility changing
    ///
    /// Fully visible: every other handle is paused, muted and reset, then
    /// this cell plays unmuted (from zero if it was reset). Offscreen: the
    /// cell's handle is paused, muted and reset but stays cached. Partial
    /// visibility changes nothing.
    pub fn on_visibility_changed(&mut self, cell: CellId, state: VisibilityState) {
        let Some(id) = self.cells.get(&cell).copied() else {
            debug!(cell = %cell, ?state, "Visibility change for unbound cell");
            return;
        };

        match state {
            VisibilityState::FullyVisible => self.activate(cell, id, true),
            VisibilityState::Offscreen => {
                if self.active == Some(id) {
                    self.active = None;
                }
                self.silence_handle(id, true);
            }
            VisibilityState::PartiallyVisible => {}
        }
    }

    /// Explicit tap on a cell
    ///
    /// Playing (or waiting to play) pauses and mutes. Otherwise every other
    /// handle is paused and muted, then this one plays unmuted.
    pub fn user_toggled_playback(&mut self, cell: CellId) {
        let Some(id) = self.cells.get(&cell).copied() else {
            debug!(cell = %cell, "Toggle on unbound cell");
            return;
        };

        let running = self
            .cache
            .get(id)
            .map(|h| h.is_playing() || h.autoplay_requested())
            .unwrap_or(false);

        if running {
            debug!(cell = %cell, handle = %id, "User paused playback");
            if self.active == Some(id) {
                self.active = None;
            }
            self.silence_handle(id, false);
        } else {
            debug!(cell = %cell, handle = %id, "User started playback");
            self.activate(cell, id, false);
        }
    }

    /// Recycle a cell before it shows a different source
    ///
    /// Pauses the outgoing handle, drops it from the cache and releases the
    /// cell's reference. The handle is destroyed once no other cell holds
    /// it. Unbound cells are left alone.
    pub fn prepare_for_reuse(&mut self, cell: CellId) {
        let Some(id) = self.cells.remove(&cell) else {
            return;
        };

        if self.active == Some(id) {
            self.active = None;
        }
        self.silence_handle(id, false);

        let Some(handle) = self.cache.get_mut(id) else {
            return;
        };
        let key = handle.source().key().to_string();
        let episode_id = handle.source().episode_id();
        let remaining = handle.remove_holder();

        if self.cache.evict(&key, id) {
            debug!(cell = %cell, handle = %id, "Evicted player from cache");
            self.events.emit_lossy(ReelEvent::PlayerEvicted {
                handle_id: id,
                episode_id,
                timestamp: chrono::Utc::now(),
            });
        }

        if remaining == 0 {
            self.destroy(id);
        } else {
            debug!(handle = %id, remaining, "Player still held by other cells");
        }
    }

    /// Pause and release every handle and forget every cell
    ///
    /// Returns the number of handles released.
    pub fn teardown(&mut self) -> usize {
        let handles = self.cache.drain();
        let released = handles.len();
        for handle in handles {
            handle.release();
        }
        self.cells.clear();
        self.active = None;
        self.active_cell = None;
        self.pending_confirmations.clear();

        info!(released, "Feed torn down");
        self.events.emit_lossy(ReelEvent::FeedTornDown {
            released,
            timestamp: chrono::Utc::now(),
        });
        released
    }

    /// Apply an asynchronous media report
    ///
    /// Reports naming a handle that is gone, or a source the handle no
    /// longer plays, are dropped.
    pub fn handle_readiness(&mut self, report: ReadinessReport) {
        let id = report.handle_id;
        let current = self.cache.get(id).map(|h| h.source().key() == report.source_key);
        if current != Some(true) {
            debug!(handle = %id, event = ?report.event, "Dropping stale media report");
            return;
        }

        match report.event {
            MediaEvent::Ready => self.on_ready(id),
            MediaEvent::Failed(reason) => self.on_failed(id, reason),
            MediaEvent::Ended => self.playback_ended(id),
        }
    }

    /// One-shot check that a started handle is actually advancing
    ///
    /// Returns false when the handle is still supposed to be playing but
    /// its clock is not moving. No retry is attempted.
    pub fn confirm_playback(&mut self, id: HandleId) -> bool {
        let Some(handle) = self.cache.get(id) else {
            return true;
        };
        if self.active != Some(id) || !handle.is_playing() {
            // Superseded since the check was scheduled
            return true;
        }
        if handle.is_advancing() {
            return true;
        }

        let episode_id = handle.source().episode_id();
        warn!(handle = %id, episode_id, url = %handle.source().url(), "Playback did not start");
        self.events.emit_lossy(ReelEvent::PlaybackNotStarted {
            handle_id: id,
            episode_id,
            timestamp: chrono::Utc::now(),
        });
        false
    }

    /// End of item: loop the active handle from zero
    pub fn playback_ended(&mut self, id: HandleId) {
        if self.active != Some(id) {
            return;
        }
        if let Some(handle) = self.cache.get_mut(id) {
            if handle.is_playing() {
                debug!(handle = %id, "Looping to start");
                handle.restart_from_zero();
            }
        }
    }

    /// Pause, mute and reset every live handle
    ///
    /// Returns how many handles were playing.
    pub fn silence_all(&mut self) -> usize {
        self.active = None;
        let mut changes = Vec::new();
        for handle in self.cache.iter_mut() {
            let old = handle.silence(true);
            if old != handle.state() {
                changes.push((handle.id(), handle.source().episode_id(), old, handle.state()));
            }
        }
        let stopped = changes.len();
        self.emit_changes(changes);
        debug!(stopped, "Silenced all players");
        stopped
    }

    /// Handles started since the last call, awaiting a confirmation check
    pub fn take_confirmations(&mut self) -> Vec<HandleId> {
        std::mem::take(&mut self.pending_confirmations)
    }

    pub fn cell_state(&self, cell: CellId) -> CellState {
        let Some(handle) = self.cells.get(&cell).and_then(|id| self.cache.get(*id)) else {
            return CellState::Unbound;
        };
        match handle.state() {
            PlaybackState::Stopped => CellState::Bound,
            PlaybackState::Playing => CellState::Playing,
            PlaybackState::Paused => CellState::Paused,
        }
    }

    pub fn handle_for(&self, cell: CellId) -> Option<HandleId> {
        self.cells.get(&cell).copied()
    }

    pub fn snapshot(&self, id: HandleId) -> Option<HandleSnapshot> {
        self.cache.get(id).map(PlayerHandle::snapshot)
    }

    pub fn cell_snapshot(&self, cell: CellId) -> Option<HandleSnapshot> {
        self.handle_for(cell).and_then(|id| self.snapshot(id))
    }

    pub fn active_handle(&self) -> Option<HandleId> {
        self.active
    }

    /// Number of sources in the cache index
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of live handles, including detached ones still held by a cell
    pub fn live_count(&self) -> usize {
        self.cache.live_count()
    }

    /// Handles currently playing with non-zero volume
    pub fn audible_count(&self) -> usize {
        self.cache.iter().filter(|h| h.is_audible()).count()
    }

    pub fn is_cached(&self, id: HandleId) -> bool {
        self.cache.is_cached(id)
    }

    pub fn active_playback(&self) -> Option<ActivePlayback> {
        let id = self.active?;
        let handle = self.cache.get(id).filter(|h| h.is_playing())?;
        // A handle shared between cells reports the cell that started it
        let cell = self
            .active_cell
            .filter(|cell| self.cells.get(cell) == Some(&id))
            .or_else(|| {
                self.cells
                    .iter()
                    .filter(|(_, h)| **h == id)
                    .map(|(c, _)| *c)
                    .min()
            });
        Some(ActivePlayback {
            handle_id: id,
            cell,
            series_id: handle.source().series_id(),
            position: handle.position(),
        })
    }

    fn open_handle(&mut self, source: MediaSource) -> HandleId {
        let id = HandleId::new();
        let notifier =
            ReadinessNotifier::new(id, source.key().to_string(), self.readiness_tx.clone());
        let player = self.backend.open(&source, notifier);
        let episode_id = source.episode_id();

        info!(handle = %id, episode_id, url = %source.url(), "Created player");
        self.cache.insert(PlayerHandle::new(id, source, player));
        self.events.emit_lossy(ReelEvent::PlayerCreated {
            handle_id: id,
            episode_id,
            timestamp: chrono::Utc::now(),
        });
        id
    }

    /// Make `id` the one audible handle, or queue it to become so
    fn activate(&mut self, cell: CellId, id: HandleId, reset_others: bool) {
        let Some(readiness) = self.cache.get(id).map(PlayerHandle::readiness) else {
            return;
        };

        self.silence_others(id, reset_others);

        match readiness {
            Readiness::Ready => {
                self.active = Some(id);
                self.active_cell = Some(cell);
                self.start(id);
            }
            Readiness::Loading => {
                self.active = Some(id);
                self.active_cell = Some(cell);
                if let Some(handle) = self.cache.get_mut(id) {
                    handle.request_autoplay();
                }
                debug!(cell = %cell, handle = %id, "Play deferred until media is ready");
            }
            Readiness::NotPlayable => {
                // Retry with a fresh handle and a fresh load
                let Some(source) = self.cache.get(id).map(|h| h.source().clone()) else {
                    return;
                };
                info!(cell = %cell, handle = %id, "Reloading media that failed to load");
                self.prepare_for_reuse(cell);
                let fresh = self.bind(cell, source);
                self.active = Some(fresh);
                self.active_cell = Some(cell);
                if let Some(handle) = self.cache.get_mut(fresh) {
                    handle.request_autoplay();
                }
            }
        }
    }

    fn start(&mut self, id: HandleId) {
        let Some(handle) = self.cache.get_mut(id) else {
            return;
        };
        let old = handle.start_audible();
        let episode_id = handle.source().episode_id();
        debug!(handle = %id, episode_id, "Playing");
        self.pending_confirmations.push(id);
        self.emit_changes(vec![(id, episode_id, old, PlaybackState::Playing)]);
    }

    fn on_ready(&mut self, id: HandleId) {
        let Some(handle) = self.cache.get_mut(id) else {
            return;
        };
        handle.set_readiness(Readiness::Ready);
        debug!(handle = %id, "Media ready");

        if self.active == Some(id) && handle.autoplay_requested() {
            self.silence_others(id, false);
            self.start(id);
        }
    }

    fn on_failed(&mut self, id: HandleId, reason: String) {
        let Some(handle) = self.cache.get_mut(id) else {
            return;
        };
        handle.set_readiness(Readiness::NotPlayable);
        handle.clear_autoplay();
        let episode_id = handle.source().episode_id();
        warn!(handle = %id, episode_id, reason = %reason, "Media not playable");

        if self.active == Some(id) {
            self.active = None;
        }
        self.silence_handle(id, false);
        self.events.emit_lossy(ReelEvent::MediaNotPlayable {
            handle_id: Some(id),
            episode_id,
            reason,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Pause and mute every live handle except `keep`
    fn silence_others(&mut self, keep: HandleId, reset: bool) {
        let mut changes = Vec::new();
        for handle in self.cache.iter_mut() {
            if handle.id() == keep || !handle.is_active() {
                continue;
            }
            let old = handle.silence(reset);
            if old != handle.state() {
                changes.push((handle.id(), handle.source().episode_id(), old, handle.state()));
            }
        }
        self.emit_changes(changes);
    }

    fn silence_handle(&mut self, id: HandleId, reset: bool) {
        let Some(handle) = self.cache.get_mut(id) else {
            return;
        };
        let old = handle.silence(reset);
        let new = handle.state();
        let episode_id = handle.source().episode_id();
        self.emit_changes(vec![(id, episode_id, old, new)]);
    }

    fn destroy(&mut self, id: HandleId) {
        if let Some(handle) = self.cache.remove(id) {
            debug!(handle = %id, "Released player");
            handle.release();
        }
        self.pending_confirmations.retain(|h| *h != id);
    }

    fn emit_changes(&self, changes: Vec<(HandleId, EpisodeId, PlaybackState, PlaybackState)>) {
        for (handle_id, episode_id, old_state, new_state) in changes {
            if old_state == new_state {
                continue;
            }
            self.events.emit_lossy(ReelEvent::PlaybackStateChanged {
                handle_id,
                episode_id,
                old_state,
                new_state,
                timestamp: chrono::Utc::now(),
            });
        }
    }
}

impl Drop for FeedPlaybackController {
    fn drop(&mut self) {
        for handle in self.cache.drain() {
            handle.release();
        }
    }
}
