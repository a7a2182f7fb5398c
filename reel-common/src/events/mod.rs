//! Event types for the Reel event system
//!
//! Provides shared event definitions and the EventBus. The playback core
//! reports failures as events and log lines rather than as error values,
//! so anything that wants to react to "nothing plays" subscribes here.

mod playback_types;

pub use playback_types::{
    CellId, CellState, HandleId, PlaybackState, Readiness, VisibilityState, WatchSurface,
};

use crate::model::{EpisodeId, SeriesId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Reel event types
///
/// Events are broadcast via EventBus and can be serialized for external
/// consumers (UI bridge, diagnostics).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReelEvent {
    /// A player handle changed playback state
    PlaybackStateChanged {
        handle_id: HandleId,
        episode_id: EpisodeId,
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new player handle was created and cached
    PlayerCreated {
        handle_id: HandleId,
        episode_id: EpisodeId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A player handle was dropped from the cache
    PlayerEvicted {
        handle_id: HandleId,
        episode_id: EpisodeId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Media behind a handle (or its URL) cannot be played
    ///
    /// The cell stays paused showing its poster until the user retries.
    MediaNotPlayable {
        /// None when no handle was created (URL failed to decode)
        handle_id: Option<HandleId>,
        episode_id: EpisodeId,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback was requested but the player had not started when checked
    PlaybackNotStarted {
        handle_id: HandleId,
        episode_id: EpisodeId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A series crossed its watch threshold and joined "continue watching"
    ContinueWatchingAdded {
        series_id: SeriesId,
        surface: WatchSurface,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The feed released every player
    FeedTornDown {
        released: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ReelEvent {
    /// Event type name (matches the serde tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            ReelEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            ReelEvent::PlayerCreated { .. } => "PlayerCreated",
            ReelEvent::PlayerEvicted { .. } => "PlayerEvicted",
            ReelEvent::MediaNotPlayable { .. } => "MediaNotPlayable",
            ReelEvent::PlaybackNotStarted { .. } => "PlaybackNotStarted",
            ReelEvent::ContinueWatchingAdded { .. } => "ContinueWatchingAdded",
            ReelEvent::FeedTornDown { .. } => "FeedTornDown",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over a tokio broadcast channel. Every subscriber gets every
/// event emitted after it subscribed; slow subscribers lose the oldest
/// events once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReelEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use reel_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ReelEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ReelEvent,
    ) -> Result<usize, broadcast::error::SendError<ReelEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ReelEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
