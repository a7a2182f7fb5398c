//! Catalog backend client
//!
//! Thin wrapper over the fixed backend contract. Every request carries the
//! bearer token and the device uuid; every response is an
//! `{ "error": bool, "data": ... }` envelope. No retries: callers log the
//! error and show an empty state.

use crate::error::{Error, Result};
use reel_common::config::ApiConfig;
use reel_common::model::{Catalog, Envelope, Episode, EpisodeList, Series, SeriesId, SeriesPayload};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("reel-player/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FavouriteRequest<'a> {
    uuid: &'a str,
    video_id: SeriesId,
}

/// Catalog backend client
#[derive(Debug, Clone)]
pub struct ContentClient {
    http_client: reqwest::Client,
    base_url: String,
    bearer_token: String,
    device_uuid: String,
    lang: String,
}

impl ContentClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
            device_uuid: config.device_uuid.clone(),
            lang: config.lang.clone(),
        })
    }

    /// Tags, categories and every series
    pub async fn fetch_catalog(&self) -> Result<Catalog> {
        let request = self
            .http_client
            .get(self.url("/video/fetch"))
            .query(&[("uuid", self.device_uuid.as_str()), ("lang", self.lang.as_str())]);

        let catalog: Catalog = self.send("video/fetch", request).await?;
        info!(
            series = catalog.series.len(),
            categories = catalog.categories.len(),
            "Fetched catalog"
        );
        Ok(catalog)
    }

    /// Episodes of one series, in backend order
    pub async fn fetch_episodes(&self, series_id: SeriesId) -> Result<Vec<Episode>> {
        let series = series_id.to_string();
        let request = self.http_client.get(self.url("/video/episodes")).query(&[
            ("uuid", self.device_uuid.as_str()),
            ("videoId", series.as_str()),
            ("lang", self.lang.as_str()),
        ]);

        let list: EpisodeList = self.send("video/episodes", request).await?;
        debug!(series_id, episodes = list.episodes.len(), "Fetched episodes");
        Ok(list.episodes)
    }

    /// A single series with its current favourite flag
    pub async fn fetch_series(&self, series_id: SeriesId) -> Result<Series> {
        let series = series_id.to_string();
        let request = self.http_client.get(self.url("/video/fetchSpecific")).query(&[
            ("uuid", self.device_uuid.as_str()),
            ("lang", self.lang.as_str()),
            ("id", series.as_str()),
        ]);

        let payload: SeriesPayload = self.send("video/fetchSpecific", request).await?;
        Ok(payload.video)
    }

    /// Flip the favourite flag; returns the updated series
    pub async fn toggle_favorite(&self, series_id: SeriesId) -> Result<Series> {
        let body = FavouriteRequest {
            uuid: &self.device_uuid,
            video_id: series_id,
        };
        let request = self
            .http_client
            .post(self.url("/video/favourite"))
            .json(&body);

        let payload: SeriesPayload = self.send("video/favourite", request).await?;
        info!(
            series_id,
            is_favourite = payload.video.is_favourite,
            "Toggled favourite"
        );
        Ok(payload.video)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::ApiStatus(status.as_u16(), error_text));
        }

        let envelope: Envelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("{}: {}", endpoint, e)))?;

        if envelope.error {
            return Err(Error::Backend(endpoint.to_string()));
        }

        serde_json::from_value(envelope.data)
            .map_err(|e| Error::Parse(format!("{}: {}", endpoint, e)))
    }
}
