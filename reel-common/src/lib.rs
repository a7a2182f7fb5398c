//! # Reel Common Library
//!
//! Shared code for the Reel short-drama player:
//! - Content model returned by the catalog backend
//! - Event types (ReelEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Media URL obfuscation helpers
//! - Playback-clock formatting

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod obfuscation;
pub mod time;

pub use error::{Error, Result};
