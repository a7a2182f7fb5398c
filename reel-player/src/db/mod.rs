//! Local persistence
//!
//! A single SQLite file under the root folder holding a key-value
//! `settings` table. The "continue watching" list lives there as a JSON
//! array.

pub mod continue_watching;
pub mod init;
pub mod settings;

pub use continue_watching::ContinueWatchingStore;
pub use init::{init_database, init_memory_database};
