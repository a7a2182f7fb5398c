//! Player handle: one media player bound to one source

use super::backend::MediaPlayer;
use super::source::MediaSource;
use reel_common::events::{HandleId, PlaybackState, Readiness};
use std::time::Duration;

/// Point-in-time view of a handle, safe to hand out of the owner task
#[derive(Debug, Clone, PartialEq)]
pub struct HandleSnapshot {
    pub id: HandleId,
    pub source: MediaSource,
    pub state: PlaybackState,
    pub volume: f32,
    pub position: Duration,
    pub readiness: Readiness,
    pub surface_attached: bool,
    /// Number of cells currently bound to this handle
    pub holders: usize,
}

impl HandleSnapshot {
    pub fn is_audible(&self) -> bool {
        self.state == PlaybackState::Playing && self.volume > 0.0
    }
}

/// Wraps a single underlying media player
///
/// State transitions go through this type so the tracked state, volume and
/// the real player never disagree.
pub struct PlayerHandle {
    id: HandleId,
    source: MediaSource,
    player: Box<dyn MediaPlayer>,
    state: PlaybackState,
    volume: f32,
    readiness: Readiness,
    /// Seek to zero before the next start
    rewind_pending: bool,
    /// Start as soon as the media reports ready
    autoplay: bool,
    surface_attached: bool,
    holders: usize,
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("state", &self.state)
            .field("volume", &self.volume)
            .field("readiness", &self.readiness)
            .field("holders", &self.holders)
            .finish_non_exhaustive()
    }
}

impl PlayerHandle {
    /// Wrap a freshly opened player: muted, not started, loading
    pub fn new(id: HandleId, source: MediaSource, mut player: Box<dyn MediaPlayer>) -> Self {
        player.set_volume(0.0);
        player.attach_surface();
        Self {
            id,
            source,
            player,
            state: PlaybackState::Stopped,
            volume: 0.0,
            readiness: Readiness::Loading,
            rewind_pending: false,
            autoplay: false,
            surface_attached: true,
            holders: 0,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn position(&self) -> Duration {
        self.player.position()
    }

    pub fn holders(&self) -> usize {
        self.holders
    }

    pub fn autoplay_requested(&self) -> bool {
        self.autoplay
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_audible(&self) -> bool {
        self.is_playing() && self.volume > 0.0
    }

    /// Anything that would need silencing when another handle takes over
    pub(crate) fn is_active(&self) -> bool {
        self.is_playing() || self.volume > 0.0 || self.autoplay
    }

    pub fn is_advancing(&self) -> bool {
        self.player.is_advancing()
    }

    pub fn snapshot(&self) -> HandleSnapshot {
        HandleSnapshot {
            id: self.id,
            source: self.source.clone(),
            state: self.state,
            volume: self.volume,
            position: self.position(),
            readiness: self.readiness,
            surface_attached: self.surface_attached,
            holders: self.holders,
        }
    }

    pub(crate) fn add_holder(&mut self) {
        self.holders += 1;
        if !self.surface_attached {
            self.player.attach_surface();
            self.surface_attached = true;
        }
    }

    /// Returns the remaining holder count
    pub(crate) fn remove_holder(&mut self) -> usize {
        self.holders = self.holders.saturating_sub(1);
        if self.holders == 0 && self.surface_attached {
            self.player.detach_surface();
            self.surface_attached = false;
        }
        self.holders
    }

    pub(crate) fn set_readiness(&mut self, readiness: Readiness) {
        self.readiness = readiness;
    }

    pub(crate) fn request_autoplay(&mut self) {
        self.autoplay = true;
    }

    pub(crate) fn clear_autoplay(&mut self) {
        self.autoplay = false;
    }

    /// Start playback unmuted at full volume
    ///
    /// Honors a pending rewind first. Returns the previous state.
    pub(crate) fn start_audible(&mut self) -> PlaybackState {
        let old = self.state;
        if self.rewind_pending {
            self.player.seek_to_start();
            self.rewind_pending = false;
        }
        self.autoplay = false;
        self.volume = 1.0;
        self.player.set_volume(1.0);
        self.player.play();
        self.state = PlaybackState::Playing;
        old
    }

    /// Pause and mute
    ///
    /// `reset` marks the handle to restart from zero when it next plays.
    /// A handle that never started stays `Stopped`. Returns the previous
    /// state.
    pub(crate) fn silence(&mut self, reset: bool) -> PlaybackState {
        let old = self.state;
        self.autoplay = false;
        self.volume = 0.0;
        self.player.set_volume(0.0);
        if self.state == PlaybackState::Playing {
            self.player.pause();
            self.state = PlaybackState::Paused;
        }
        if reset && self.state != PlaybackState::Stopped {
            self.rewind_pending = true;
        }
        old
    }

    /// Loop back to the start without changing state
    pub(crate) fn restart_from_zero(&mut self) {
        self.player.seek_to_start();
        self.rewind_pending = false;
    }

    /// Final release of the underlying player
    pub(crate) fn release(mut self) {
        self.silence(false);
        if self.surface_attached {
            self.player.detach_surface();
        }
    }
}
