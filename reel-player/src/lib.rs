//! # Reel Player Library (reel-player)
//!
//! Playback core for the short-drama discover feed and detail player.
//!
//! **Purpose:** Keep exactly one feed video audible, reuse player instances
//! across cell recycling, and tie the feed to the catalog backend, the
//! "continue watching" list and the entitlement gate.
//!
//! **Architecture:** A single owner task ([`playback::FeedDriver`]) holds the
//! [`playback::FeedPlaybackController`]. Commands and media readiness reports
//! reach it over channels, so no lock guards the player cache.

pub mod catalog;
pub mod db;
pub mod error;
pub mod playback;
pub mod services;

pub use error::{Error, Result};
