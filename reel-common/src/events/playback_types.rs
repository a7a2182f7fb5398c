//! Playback-related type definitions
//!
//! Supporting types for player handle state, per-cell state and visibility.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one on-screen feed cell (a reusable UI slot, not an item)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u64);

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Identifies one player handle for its whole lifetime
///
/// A fresh id is minted every time a handle is created, so a readiness
/// report carrying an old id can never be applied to a replacement handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(pub Uuid);

impl HandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback state of a single player handle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Never started since creation
    Stopped,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Load status of the media behind a handle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Asynchronous load still in flight
    Loading,
    /// Media reported playable
    Ready,
    /// Media reported not playable; user action required
    NotPlayable,
}

/// Lifecycle state of a feed cell
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Unbound,
    /// Bound to a source whose handle has not started yet
    Bound,
    Playing,
    Paused,
}

impl std::fmt::Display for CellState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellState::Unbound => write!(f, "unbound"),
            CellState::Bound => write!(f, "bound"),
            CellState::Playing => write!(f, "playing"),
            CellState::Paused => write!(f, "paused"),
        }
    }
}

/// How much of a cell the viewport shows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityState {
    FullyVisible,
    PartiallyVisible,
    Offscreen,
}

/// Screen a watch-time report comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WatchSurface {
    /// Vertical discover feed
    Feed,
    /// Full-screen detail player
    Detail,
}

impl std::fmt::Display for WatchSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchSurface::Feed => write!(f, "feed"),
            WatchSurface::Detail => write!(f, "detail"),
        }
    }
}
