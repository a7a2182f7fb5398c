//! "Continue watching" list
//!
//! An ordered set of series ids, oldest first, persisted as a JSON array
//! under one settings key. Every mutation rewrites the whole list.

use super::settings::{get_setting, set_setting};
use crate::error::{Error, Result};
use reel_common::model::SeriesId;
use sqlx::{Pool, Sqlite};
use tracing::{debug, warn};

/// Settings key holding the list
pub const SAVED_IDS_KEY: &str = "saved_video_ids";

#[derive(Debug, Clone)]
pub struct ContinueWatchingStore {
    db: Pool<Sqlite>,
    ids: Vec<SeriesId>,
}

impl ContinueWatchingStore {
    /// Load the stored list
    ///
    /// A value that is not a JSON array of ids is discarded with a warning
    /// and treated as empty.
    pub async fn load(db: Pool<Sqlite>) -> Result<Self> {
        let raw: Option<String> = get_setting(&db, SAVED_IDS_KEY).await?;
        let ids = match raw {
            Some(json) => match serde_json::from_str::<Vec<SeriesId>>(&json) {
                Ok(ids) => dedup_in_order(ids),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable continue-watching list");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Ok(Self { db, ids })
    }

    pub fn ids(&self) -> &[SeriesId] {
        &self.ids
    }

    pub fn contains(&self, id: SeriesId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Add a series at the end; false if it was already present
    pub async fn append(&mut self, id: SeriesId) -> Result<bool> {
        if self.contains(id) {
            return Ok(false);
        }
        self.ids.push(id);
        self.persist().await?;
        debug!(series_id = id, "Added to continue watching");
        Ok(true)
    }

    /// Remove a series; false if it was not present
    pub async fn remove(&mut self, id: SeriesId) -> Result<bool> {
        let before = self.ids.len();
        self.ids.retain(|x| *x != id);
        if self.ids.len() == before {
            return Ok(false);
        }
        self.persist().await?;
        debug!(series_id = id, "Removed from continue watching");
        Ok(true)
    }

    async fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.ids).map_err(|e| Error::Parse(e.to_string()))?;
        set_setting(&self.db, SAVED_IDS_KEY, json).await
    }
}

fn dedup_in_order(ids: Vec<SeriesId>) -> Vec<SeriesId> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
