//! Playable media identity

use crate::error::{Error, Result};
use reel_common::model::{Episode, EpisodeId, SeriesId};
use reel_common::obfuscation;
use reqwest::Url;

/// A playable item: decoded URL plus the episode it belongs to
///
/// Immutable once created. Cache identity is the decoded URL
/// ([`MediaSource::key`]); two episodes pointing at the same file share a
/// player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaSource {
    url: String,
    episode_id: EpisodeId,
    series_id: SeriesId,
}

impl MediaSource {
    /// Build a source from an already decoded URL
    ///
    /// Only absolute http(s) URLs are accepted.
    pub fn new(url: impl Into<String>, episode_id: EpisodeId, series_id: SeriesId) -> Result<Self> {
        let url = url.into();
        let parsed = Url::parse(&url).map_err(|e| Error::InvalidMedia {
            episode_id,
            reason: format!("malformed URL: {}", e),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidMedia {
                episode_id,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            url,
            episode_id,
            series_id,
        })
    }

    /// Decode an episode's obfuscated URL and build its source
    pub fn from_episode(episode: &Episode, url_key: &str) -> Result<Self> {
        let blob = episode
            .media_blob
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| Error::InvalidMedia {
                episode_id: episode.id,
                reason: "episode has no media URL".to_string(),
            })?;

        let url = obfuscation::reveal(blob, url_key).map_err(|e| Error::InvalidMedia {
            episode_id: episode.id,
            reason: e.to_string(),
        })?;

        Self::new(url, episode.id, episode.series_id)
    }

    /// Cache key
    pub fn key(&self) -> &str {
        &self.url
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn episode_id(&self) -> EpisodeId {
        self.episode_id
    }

    pub fn series_id(&self) -> SeriesId {
        self.series_id
    }
}
