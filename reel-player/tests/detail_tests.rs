//! Detail player session on top of the feed driver

mod helpers;

use helpers::{episode, series, URL_KEY};
use reel_common::events::{CellId, CellState, EventBus};
use reel_player::playback::{
    DetailSession, DriverConfig, FeedDriver, FeedHandle, FeedPlaybackController, LoadBehavior,
    PlayerCache, SimulatedBackend,
};
use reel_player::services::{EpisodeAccess, StaticEntitlement};
use reel_player::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const DETAIL: CellId = CellId(1000);

fn start() -> (FeedHandle, JoinHandle<()>) {
    let backend = SimulatedBackend::new(LoadBehavior::Immediate);
    let bus = EventBus::new(64);
    let (controller, readiness) =
        FeedPlaybackController::new(PlayerCache::new(), Box::new(backend), bus.clone());
    let config = DriverConfig {
        url_key: URL_KEY.to_string(),
        confirm_delay: Duration::from_millis(50),
        progress_interval: Duration::from_millis(50),
    };
    FeedDriver::new(controller, readiness, bus, config).spawn()
}

fn episodes() -> Vec<reel_common::model::Episode> {
    vec![
        episode(3, 1, 3, false, Some("https://cdn.test/s1/e3.mp4")),
        episode(1, 1, 1, true, Some("https://cdn.test/s1/e1.mp4")),
        episode(2, 1, 2, true, Some("https://cdn.test/s1/e2.mp4")),
    ]
}

#[tokio::test]
async fn test_open_plays_first_episode_and_silences_feed() {
    let (feed, task) = start();
    let feed_cell = CellId(0);
    feed.bind(feed_cell, helpers::source(9)).await.unwrap();
    feed.toggle(feed_cell).await.unwrap();
    assert_eq!(feed.cell_state(feed_cell).await.unwrap(), CellState::Playing);

    let session = DetailSession::open(
        feed.clone(),
        DETAIL,
        series(1, "Heir", 3),
        episodes(),
        Arc::new(StaticEntitlement::new(false)),
    )
    .await
    .unwrap();

    assert_eq!(session.current_episode().id, 1);
    assert_eq!(session.episode_position(), (1, 3));
    assert_eq!(session.state().await.unwrap(), CellState::Playing);
    assert_eq!(feed.cell_state(feed_cell).await.unwrap(), CellState::Paused);
    assert_eq!(feed.stats().await.unwrap().audible, 1);

    feed.shutdown().await;
    task.await.unwrap();
}

#[tokio::test]
async fn test_paid_episode_is_paywalled_without_entitlement() {
    let (feed, task) = start();
    let mut session = DetailSession::open(
        feed.clone(),
        DETAIL,
        series(1, "Heir", 3),
        episodes(),
        Arc::new(StaticEntitlement::new(false)),
    )
    .await
    .unwrap();

    assert_eq!(session.next_episode().await.unwrap(), Some(EpisodeAccess::Free));
    let err = session.next_episode().await.unwrap_err();
    assert!(matches!(err, Error::Paywalled(3)));

    // Still on episode 2, still playing
    assert_eq!(session.current_episode().episode, 2);
    assert_eq!(session.state().await.unwrap(), CellState::Playing);

    let access = session.unlock_and_select(2, "weekly").await.unwrap();
    assert_eq!(access, EpisodeAccess::Entitled);
    assert_eq!(session.episode_position(), (3, 3));
    assert_eq!(session.next_episode().await.unwrap(), None);

    feed.shutdown().await;
    task.await.unwrap();
}

#[tokio::test]
async fn test_entitled_user_plays_paid_episode() {
    let (feed, task) = start();
    let mut session = DetailSession::open(
        feed.clone(),
        DETAIL,
        series(1, "Heir", 3),
        episodes(),
        Arc::new(StaticEntitlement::new(true)),
    )
    .await
    .unwrap();

    assert_eq!(session.select_episode(2).await.unwrap(), EpisodeAccess::Entitled);
    let snap = session.snapshot().await.unwrap().unwrap();
    assert_eq!(snap.source.url(), "https://cdn.test/s1/e3.mp4");

    session.toggle().await.unwrap();
    assert_eq!(session.state().await.unwrap(), CellState::Paused);

    session.close().await.unwrap();
    assert_eq!(feed.cell_state(DETAIL).await.unwrap(), CellState::Unbound);

    feed.shutdown().await;
    task.await.unwrap();
}

#[tokio::test]
async fn test_open_without_episodes_fails() {
    let (feed, task) = start();
    let result = DetailSession::open(
        feed.clone(),
        DETAIL,
        series(1, "Empty", 0),
        Vec::new(),
        Arc::new(StaticEntitlement::new(false)),
    )
    .await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    feed.shutdown().await;
    task.await.unwrap();
}
