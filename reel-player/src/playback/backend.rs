//! Media backend abstraction
//!
//! The controller never talks to a concrete media framework. A
//! [`MediaBackend`] opens one [`MediaPlayer`] per handle and reports load
//! results through a [`ReadinessNotifier`], which may be used from any
//! thread: it only sends on a channel drained by the owner task.

use super::source::MediaSource;
use reel_common::events::HandleId;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// One underlying media player instance
pub trait MediaPlayer: Send {
    fn play(&mut self);
    fn pause(&mut self);
    /// Volume in 0.0-1.0
    fn set_volume(&mut self, volume: f32);
    fn seek_to_start(&mut self);
    fn position(&self) -> Duration;
    /// True when the playback clock is actually moving
    fn is_advancing(&self) -> bool;
    fn attach_surface(&mut self);
    fn detach_surface(&mut self);
}

/// Factory for media players
pub trait MediaBackend: Send {
    /// Create a player for `source` and start loading it asynchronously
    ///
    /// The backend must eventually call `notifier.ready()` or
    /// `notifier.failed(..)`; it may call `notifier.ended()` each time the
    /// item plays to its end.
    fn open(&mut self, source: &MediaSource, notifier: ReadinessNotifier) -> Box<dyn MediaPlayer>;
}

/// Outcome of an asynchronous media event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// Media is playable
    Ready,
    /// Media cannot be played
    Failed(String),
    /// Playback reached the end of the item
    Ended,
}

/// A media event tagged with the handle and source it belongs to
///
/// Both tags are checked on arrival; reports for a handle that has been
/// released or rebound are dropped.
#[derive(Debug, Clone)]
pub struct ReadinessReport {
    pub handle_id: HandleId,
    pub source_key: String,
    pub event: MediaEvent,
}

/// Sending half handed to a backend for one handle
#[derive(Debug, Clone)]
pub struct ReadinessNotifier {
    handle_id: HandleId,
    source_key: String,
    tx: mpsc::UnboundedSender<ReadinessReport>,
}

impl ReadinessNotifier {
    pub(crate) fn new(
        handle_id: HandleId,
        source_key: String,
        tx: mpsc::UnboundedSender<ReadinessReport>,
    ) -> Self {
        Self {
            handle_id,
            source_key,
            tx,
        }
    }

    pub fn handle_id(&self) -> HandleId {
        self.handle_id
    }

    pub fn ready(&self) {
        self.send(MediaEvent::Ready);
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.send(MediaEvent::Failed(reason.into()));
    }

    pub fn ended(&self) {
        self.send(MediaEvent::Ended);
    }

    fn send(&self, event: MediaEvent) {
        let report = ReadinessReport {
            handle_id: self.handle_id,
            source_key: self.source_key.clone(),
            event,
        };
        // Receiver gone means the feed was torn down; nothing to notify
        if self.tx.send(report).is_err() {
            debug!(handle = %self.handle_id, "Readiness report dropped, feed closed");
        }
    }
}
