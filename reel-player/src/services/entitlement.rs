//! Entitlement gate
//!
//! Purchases are handled by an external provider; the player only asks
//! whether the user currently holds an active entitlement.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reel_common::model::Episode;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Source of truth for the user's subscription
#[async_trait]
pub trait EntitlementProvider: Send + Sync {
    async fn has_active_entitlement(&self) -> Result<bool>;

    /// Buy `product_id`; returns whether the entitlement is now active
    async fn purchase(&self, product_id: &str) -> Result<bool>;
}

/// Outcome of gating one episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeAccess {
    /// Free episode, always playable
    Free,
    /// Paid episode, user is subscribed
    Entitled,
    /// Paid episode, show the paywall
    Paywalled,
}

impl EpisodeAccess {
    pub fn is_playable(self) -> bool {
        !matches!(self, EpisodeAccess::Paywalled)
    }
}

/// Decide whether `episode` may be played
///
/// A provider error counts as "not entitled".
pub async fn episode_access(
    episode: &Episode,
    provider: &dyn EntitlementProvider,
) -> EpisodeAccess {
    if episode.is_free {
        return EpisodeAccess::Free;
    }
    match provider.has_active_entitlement().await {
        Ok(true) => EpisodeAccess::Entitled,
        Ok(false) => EpisodeAccess::Paywalled,
        Err(e) => {
            debug!(episode_id = episode.id, error = %e, "Entitlement check failed");
            EpisodeAccess::Paywalled
        }
    }
}

/// Provider with a fixed answer, from configuration
#[derive(Debug, Default)]
pub struct StaticEntitlement {
    active: AtomicBool,
}

impl StaticEntitlement {
    pub fn new(active: bool) -> Self {
        Self {
            active: AtomicBool::new(active),
        }
    }
}

#[async_trait]
impl EntitlementProvider for StaticEntitlement {
    async fn has_active_entitlement(&self) -> Result<bool> {
        Ok(self.active.load(Ordering::SeqCst))
    }

    async fn purchase(&self, product_id: &str) -> Result<bool> {
        if product_id.trim().is_empty() {
            return Err(Error::Purchase("empty product id".to_string()));
        }
        info!(product_id, "Granting static entitlement");
        self.active.store(true, Ordering::SeqCst);
        Ok(true)
    }
}
