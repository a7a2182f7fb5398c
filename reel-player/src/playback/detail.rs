//! Detail player session
//!
//! Plays one series on a dedicated cell of the shared feed driver, so the
//! single-audible-video rule also covers the detail screen. Episode
//! switches go through the entitlement gate.

use super::driver::FeedHandle;
use super::handle::HandleSnapshot;
use crate::error::{Error, Result};
use crate::services::{episode_access, EntitlementProvider, EpisodeAccess};
use reel_common::events::{CellId, CellState, VisibilityState, WatchSurface};
use reel_common::model::{Episode, Series};
use std::sync::Arc;
use tracing::{debug, info};

pub struct DetailSession {
    feed: FeedHandle,
    cell: CellId,
    series: Series,
    episodes: Vec<Episode>,
    current: usize,
    entitlement: Arc<dyn EntitlementProvider>,
}

impl std::fmt::Debug for DetailSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailSession")
            .field("cell", &self.cell)
            .field("series", &self.series.id)
            .field("episodes", &self.episodes.len())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl DetailSession {
    /// Silence the feed and start the first episode of `series`
    pub async fn open(
        feed: FeedHandle,
        cell: CellId,
        series: Series,
        mut episodes: Vec<Episode>,
        entitlement: Arc<dyn EntitlementProvider>,
    ) -> Result<Self> {
        if episodes.is_empty() {
            return Err(Error::NotFound(format!("episodes of series {}", series.id)));
        }
        episodes.sort_by_key(|e| e.episode);

        feed.silence_all().await?;
        feed.set_surface(cell, WatchSurface::Detail).await?;

        info!(series_id = series.id, title = %series.title, "Opening detail player");
        let mut session = Self {
            feed,
            cell,
            series,
            episodes,
            current: 0,
            entitlement,
        };
        session.select_episode(0).await?;
        Ok(session)
    }

    /// Switch to the episode at `index` (0-based, in episode order)
    ///
    /// A paid episode without entitlement is refused with
    /// [`Error::Paywalled`] and the current episode keeps playing.
    pub async fn select_episode(&mut self, index: usize) -> Result<EpisodeAccess> {
        let episode = self
            .episodes
            .get(index)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("episode index {}", index)))?;

        let access = episode_access(&episode, self.entitlement.as_ref()).await;
        if !access.is_playable() {
            info!(episode_id = episode.id, number = episode.episode, "Episode behind paywall");
            return Err(Error::Paywalled(episode.id));
        }

        let episode_id = episode.id;
        if self.feed.bind_episode(self.cell, episode).await?.is_none() {
            return Err(Error::InvalidMedia {
                episode_id,
                reason: "media URL unusable".to_string(),
            });
        }
        self.feed
            .visibility(self.cell, VisibilityState::FullyVisible)
            .await?;

        self.current = index;
        debug!(episode_id, ?access, "Detail episode selected");
        Ok(access)
    }

    /// Advance to the next episode; `None` at the last one
    pub async fn next_episode(&mut self) -> Result<Option<EpisodeAccess>> {
        let next = self.current + 1;
        if next >= self.episodes.len() {
            return Ok(None);
        }
        self.select_episode(next).await.map(Some)
    }

    /// Buy through the provider, then retry the episode
    pub async fn unlock_and_select(
        &mut self,
        index: usize,
        product_id: &str,
    ) -> Result<EpisodeAccess> {
        if !self.entitlement.purchase(product_id).await? {
            return Err(Error::Purchase(format!("{} not granted", product_id)));
        }
        self.select_episode(index).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.feed.toggle(self.cell).await
    }

    pub async fn state(&self) -> Result<CellState> {
        self.feed.cell_state(self.cell).await
    }

    pub async fn snapshot(&self) -> Result<Option<HandleSnapshot>> {
        self.feed.snapshot(self.cell).await
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn current_episode(&self) -> &Episode {
        &self.episodes[self.current]
    }

    /// Current episode number and total episode count of the series
    pub fn episode_position(&self) -> (u32, u32) {
        let total = self.series.total_episodes.max(self.episodes.len() as u32);
        (self.current_episode().episode, total)
    }

    /// Release the detail cell
    pub async fn close(self) -> Result<()> {
        self.feed.reuse(self.cell).await?;
        debug!(series_id = self.series.id, "Detail player closed");
        Ok(())
    }
}
