//! External services: catalog backend and entitlement provider

pub mod content_client;
pub mod entitlement;

pub use content_client::ContentClient;
pub use entitlement::{episode_access, EntitlementProvider, EpisodeAccess, StaticEntitlement};
