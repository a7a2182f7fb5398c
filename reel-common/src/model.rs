//! Content model returned by the catalog backend
//!
//! Field names follow the backend's camelCase JSON. A series is called a
//! "video" on the wire; it is a `Series` here.

use serde::{Deserialize, Serialize};

/// Series identifier (`videoId` on the wire)
pub type SeriesId = i64;

/// Episode identifier
pub type EpisodeId = i64;

/// Response envelope wrapping every backend payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
    /// Backend-reported failure flag
    pub error: bool,
    /// Absent on some failure responses
    #[serde(default)]
    pub data: T,
}

/// Series tag
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Tag {
    pub id: i64,
    pub title: String,
}

/// Catalog category (a row on the home screen)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub pos: i64,
}

/// A short-drama series
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: SeriesId,
    #[serde(default)]
    pub pos: Option<i64>,
    pub title: String,
    pub description: String,
    /// Cover image URL
    pub cover: String,
    pub category_id: i64,
    pub tag_id: i64,
    pub total_episodes: u32,
    pub is_auto_unlock: bool,
    pub is_favourite: bool,
}

/// Full catalog: tags, categories and every series
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Catalog {
    pub tags: Vec<Tag>,
    pub categories: Vec<Category>,
    #[serde(rename = "videos")]
    pub series: Vec<Series>,
}

impl Catalog {
    /// Look up a series by id
    pub fn series(&self, id: SeriesId) -> Option<&Series> {
        self.series.iter().find(|s| s.id == id)
    }
}

/// One episode of a series
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: EpisodeId,
    #[serde(rename = "videoId")]
    pub series_id: SeriesId,
    /// 1-based episode number
    pub episode: u32,
    pub price: i64,
    pub is_free: bool,
    pub is_available: bool,
    pub total_likes: i64,
    #[serde(default)]
    pub is_liked: Option<bool>,
    /// Obfuscated media URL (see [`crate::obfuscation`])
    #[serde(rename = "videoUrl", default)]
    pub media_blob: Option<String>,
}

/// `data` payload of the episodes endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EpisodeList {
    pub episodes: Vec<Episode>,
}

/// `data` payload of the single-series and favourite endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeriesPayload {
    pub video: Series,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_deserializes_backend_shape() {
        let json = r#"{
            "error": false,
            "data": {
                "tags": [{"id": 1, "title": "New"}],
                "categories": [{"id": 7, "title": "Romance", "pos": 0}],
                "videos": [{
                    "id": 42,
                    "pos": 3,
                    "title": "The Heir",
                    "description": "d",
                    "cover": "https://cdn/x.jpg",
                    "categoryId": 7,
                    "tagId": 1,
                    "totalEpisodes": 60,
                    "isAutoUnlock": false,
                    "isFavourite": true
                }]
            }
        }"#;

        let envelope: Envelope<Catalog> = serde_json::from_str(json).unwrap();
        assert!(!envelope.error);
        let catalog = envelope.data;
        assert_eq!(catalog.categories[0].title, "Romance");
        let series = catalog.series(42).unwrap();
        assert_eq!(series.category_id, 7);
        assert_eq!(series.total_episodes, 60);
        assert!(series.is_favourite);
        assert!(catalog.series(1).is_none());
    }

    #[test]
    fn test_episode_optional_fields() {
        let json = r#"{
            "id": 5,
            "videoId": 42,
            "episode": 1,
            "price": 0,
            "isFree": true,
            "isAvailable": true,
            "totalLikes": 10
        }"#;

        let episode: Episode = serde_json::from_str(json).unwrap();
        assert_eq!(episode.series_id, 42);
        assert!(episode.is_liked.is_none());
        assert!(episode.media_blob.is_none());
    }

    #[test]
    fn test_series_without_pos() {
        let json = r#"{
            "id": 1, "title": "t", "description": "", "cover": "",
            "categoryId": 1, "tagId": 1, "totalEpisodes": 1,
            "isAutoUnlock": true, "isFavourite": false
        }"#;

        let series: Series = serde_json::from_str(json).unwrap();
        assert_eq!(series.pos, None);
    }
}
