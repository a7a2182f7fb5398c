//! Catalog queries the screens are built from
//!
//! Pure functions over the fetched catalog, plus discover-feed assembly
//! which needs the backend for each series' episode list.

use crate::services::ContentClient;
use reel_common::model::{Catalog, Category, Episode, Series, SeriesId};
use tracing::{debug, warn};

/// One category row with its series
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup {
    pub category: Category,
    pub series: Vec<Series>,
}

/// Group series by category, one group per category in category order
///
/// Categories with no series still get an (empty) group. Series whose
/// category is unknown are left out.
pub fn group_by_category(series: &[Series], categories: &[Category]) -> Vec<CategoryGroup> {
    categories
        .iter()
        .map(|category| CategoryGroup {
            category: category.clone(),
            series: series
                .iter()
                .filter(|s| s.category_id == category.id)
                .cloned()
                .collect(),
        })
        .collect()
}

/// Case-insensitive title substring search; a blank query matches all
pub fn search<'a>(series: &'a [Series], query: &str) -> Vec<&'a Series> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return series.iter().collect();
    }
    series
        .iter()
        .filter(|s| s.title.to_lowercase().contains(&needle))
        .collect()
}

pub fn favorites(series: &[Series]) -> Vec<&Series> {
    series.iter().filter(|s| s.is_favourite).collect()
}

/// Series from the continue-watching list, in list order
///
/// Ids no longer in the catalog are skipped.
pub fn continue_watching<'a>(series: &'a [Series], ids: &[SeriesId]) -> Vec<&'a Series> {
    ids.iter()
        .filter_map(|id| series.iter().find(|s| s.id == *id))
        .collect()
}

/// A discover-feed entry: a series and the episode that autoplays for it
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub series: Series,
    pub episode: Episode,
}

/// First episode of every series, in catalog order
///
/// Series whose episodes cannot be fetched, or that have none, are skipped
/// with a log line.
pub async fn assemble_feed(client: &ContentClient, catalog: &Catalog) -> Vec<FeedItem> {
    let mut feed = Vec::with_capacity(catalog.series.len());
    for series in &catalog.series {
        match client.fetch_episodes(series.id).await {
            Ok(episodes) => match first_episode(episodes) {
                Some(episode) => feed.push(FeedItem {
                    series: series.clone(),
                    episode,
                }),
                None => debug!(series_id = series.id, "Series has no episodes, skipped"),
            },
            Err(e) => warn!(series_id = series.id, error = %e, "Skipping series in feed"),
        }
    }
    feed
}

/// Lowest-numbered episode
fn first_episode(episodes: Vec<Episode>) -> Option<Episode> {
    episodes.into_iter().min_by_key(|e| e.episode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(id: SeriesId, title: &str, category_id: i64, fav: bool) -> Series {
        Series {
            id,
            pos: None,
            title: title.to_string(),
            description: String::new(),
            cover: String::new(),
            category_id,
            tag_id: 0,
            total_episodes: 10,
            is_auto_unlock: false,
            is_favourite: fav,
        }
    }

    fn category(id: i64, title: &str, pos: i64) -> Category {
        Category {
            id,
            title: title.to_string(),
            pos,
        }
    }

    fn episode(id: i64, number: u32) -> Episode {
        Episode {
            id,
            series_id: 1,
            episode: number,
            price: 0,
            is_free: true,
            is_available: true,
            total_likes: 0,
            is_liked: None,
            media_blob: None,
        }
    }

    #[test]
    fn test_group_by_category_keeps_order_and_empty_groups() {
        let all = vec![
            series(1, "A", 2, false),
            series(2, "B", 1, false),
            series(3, "C", 2, false),
        ];
        let cats = vec![
            category(2, "Romance", 0),
            category(1, "Drama", 1),
            category(9, "Empty", 2),
        ];

        let groups = group_by_category(&all, &cats);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].category.id, 2);
        assert_eq!(groups[0].series.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(groups[1].series.len(), 1);
        assert!(groups[2].series.is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let all = vec![
            series(1, "The Secret Heir", 1, false),
            series(2, "Revenge", 1, false),
            series(3, "Тайный наследник", 1, false),
        ];
        assert_eq!(search(&all, "heir").len(), 1);
        assert_eq!(search(&all, "  SECRET ").len(), 1);
        assert_eq!(search(&all, "НАСЛЕДНИК")[0].id, 3);
        assert_eq!(search(&all, "").len(), 3);
        assert!(search(&all, "zzz").is_empty());
    }

    #[test]
    fn test_favorites_and_continue_watching() {
        let all = vec![
            series(1, "A", 1, true),
            series(2, "B", 1, false),
            series(3, "C", 1, true),
        ];
        let favs: Vec<_> = favorites(&all).iter().map(|s| s.id).collect();
        assert_eq!(favs, vec![1, 3]);

        let cw: Vec<_> = continue_watching(&all, &[3, 99, 2]).iter().map(|s| s.id).collect();
        assert_eq!(cw, vec![3, 2]);
    }

    #[test]
    fn test_first_episode_by_number() {
        let eps = vec![episode(30, 3), episode(10, 1), episode(20, 2)];
        assert_eq!(first_episode(eps).unwrap().id, 10);
        assert!(first_episode(Vec::new()).is_none());
    }
}
