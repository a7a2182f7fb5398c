//! Feed driver task tests
//!
//! Exercise the controller through the command channel: readiness reports
//! marshaled from other threads, scroll layouts, the playback confirmation
//! timer and continue-watching persistence.

mod helpers;

use helpers::{episode, series, source, url, URL_KEY};
use reel_common::events::{
    CellId, CellState, EventBus, PlaybackState, ReelEvent, VisibilityState, WatchSurface,
};
use reel_player::db::{init_memory_database, ContinueWatchingStore};
use reel_player::playback::{
    DetailSession, DriverConfig, FeedDriver, FeedHandle, FeedPlaybackController, LoadBehavior,
    PlayerCache, Rect, SimulatedBackend, SimulatedControls, WatchProgress,
};
use reel_player::services::StaticEntitlement;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

struct Running {
    handle: FeedHandle,
    task: JoinHandle<()>,
    controls: SimulatedControls,
    events: broadcast::Receiver<ReelEvent>,
}

fn config() -> DriverConfig {
    DriverConfig {
        url_key: URL_KEY.to_string(),
        confirm_delay: Duration::from_millis(30),
        progress_interval: Duration::from_millis(10),
    }
}

fn start(
    behavior: LoadBehavior,
    progress: Option<(WatchProgress, Option<ContinueWatchingStore>)>,
) -> Running {
    let backend = SimulatedBackend::new(behavior);
    let controls = backend.controls();
    let bus = EventBus::new(256);
    let events = bus.subscribe();
    let (controller, readiness) =
        FeedPlaybackController::new(PlayerCache::new(), Box::new(backend), bus.clone());

    let mut driver = FeedDriver::new(controller, readiness, bus, config());
    if let Some((progress, store)) = progress {
        driver = driver.with_progress(progress, store);
    }
    let (handle, task) = driver.spawn();
    Running {
        handle,
        task,
        controls,
        events,
    }
}

async fn wait_for<F: Fn(&ReelEvent) -> bool>(
    events: &mut broadcast::Receiver<ReelEvent>,
    pred: F,
) -> ReelEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event not received in time")
}

fn frames(current: usize, count: usize) -> Vec<(CellId, Rect)> {
    (0..count)
        .map(|i| {
            let y = (i as f64 - current as f64) * 800.0;
            (CellId(i as u64), Rect::new(0.0, y, 400.0, 800.0))
        })
        .collect()
}

#[tokio::test]
async fn test_commands_drive_controller() {
    let mut run = start(LoadBehavior::Immediate, None);

    run.handle.bind(CellId(1), source(1)).await.unwrap();
    assert_eq!(run.handle.cell_state(CellId(1)).await.unwrap(), CellState::Bound);

    run.handle
        .visibility(CellId(1), VisibilityState::FullyVisible)
        .await
        .unwrap();
    assert_eq!(run.handle.cell_state(CellId(1)).await.unwrap(), CellState::Playing);

    run.handle.toggle(CellId(1)).await.unwrap();
    let snap = run.handle.snapshot(CellId(1)).await.unwrap().unwrap();
    assert_eq!(snap.state, PlaybackState::Paused);
    assert_eq!(snap.volume, 0.0);

    run.handle.shutdown().await;
    run.task.await.unwrap();

    // Shutdown releases every player
    assert!(!run.controls.latest(&url(1)).unwrap().surface_attached);
    wait_for(&mut run.events, |e| matches!(e, ReelEvent::FeedTornDown { .. })).await;
}

#[tokio::test]
async fn test_readiness_from_another_thread_starts_deferred_play() {
    let run = start(LoadBehavior::Manual, None);
    run.handle.bind(CellId(1), source(1)).await.unwrap();
    run.handle
        .visibility(CellId(1), VisibilityState::FullyVisible)
        .await
        .unwrap();
    assert_eq!(run.handle.cell_state(CellId(1)).await.unwrap(), CellState::Bound);

    let controls = run.controls.clone();
    std::thread::spawn(move || controls.notify_ready(&url(1)))
        .join()
        .unwrap();

    let snap = run.handle.snapshot(CellId(1)).await.unwrap().unwrap();
    assert_eq!(snap.state, PlaybackState::Playing);
    assert_eq!(snap.volume, 1.0);

    run.handle.shutdown().await;
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_layout_scrolls_playback_between_cells() {
    let run = start(LoadBehavior::Immediate, None);
    for i in 0..3 {
        run.handle
            .bind(CellId(i as u64), source(i as i64 + 1))
            .await
            .unwrap();
    }

    let changes = run
        .handle
        .layout(Rect::new(0.0, 0.0, 400.0, 800.0), frames(0, 3))
        .await
        .unwrap();
    assert_eq!(changes[0], (CellId(0), VisibilityState::FullyVisible));
    assert_eq!(run.handle.cell_state(CellId(0)).await.unwrap(), CellState::Playing);

    // Halfway: nothing changes playback
    let half: Vec<_> = frames(0, 3)
        .into_iter()
        .map(|(c, r)| (c, Rect::new(r.x, r.y - 400.0, r.width, r.height)))
        .collect();
    run.handle
        .layout(Rect::new(0.0, 0.0, 400.0, 800.0), half)
        .await
        .unwrap();
    assert_eq!(run.handle.cell_state(CellId(0)).await.unwrap(), CellState::Playing);

    run.handle
        .layout(Rect::new(0.0, 0.0, 400.0, 800.0), frames(1, 3))
        .await
        .unwrap();
    assert_eq!(run.handle.cell_state(CellId(0)).await.unwrap(), CellState::Paused);
    assert_eq!(run.handle.cell_state(CellId(1)).await.unwrap(), CellState::Playing);
    assert_eq!(run.handle.cell_state(CellId(2)).await.unwrap(), CellState::Bound);

    let stats = run.handle.stats().await.unwrap();
    assert_eq!(stats.audible, 1);
    assert_eq!(stats.cached, 3);

    run.handle.shutdown().await;
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_stalled_playback_is_reported_once() {
    let mut run = start(LoadBehavior::Immediate, None);
    run.handle.bind(CellId(1), source(1)).await.unwrap();
    run.handle
        .visibility(CellId(1), VisibilityState::FullyVisible)
        .await
        .unwrap();
    run.controls.stall(&url(1));

    let event = wait_for(&mut run.events, |e| {
        matches!(e, ReelEvent::PlaybackNotStarted { .. })
    })
    .await;
    assert!(matches!(
        event,
        ReelEvent::PlaybackNotStarted { episode_id: 10, .. }
    ));

    run.handle.shutdown().await;
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_bind_episode_uses_configured_key() {
    let run = start(LoadBehavior::Immediate, None);
    let ep = episode(77, 7, 1, true, Some("https://cdn.test/seven.mp4"));

    let bound = run.handle.bind_episode(CellId(1), ep).await.unwrap();
    assert!(bound.is_some());
    let snap = run.handle.snapshot(CellId(1)).await.unwrap().unwrap();
    assert_eq!(snap.source.url(), "https://cdn.test/seven.mp4");
    assert_eq!(snap.source.series_id(), 7);

    run.handle.shutdown().await;
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_feed_threshold_saves_continue_watching() {
    let db = init_memory_database().await.unwrap();
    let store = ContinueWatchingStore::load(db.clone()).await.unwrap();
    let progress = WatchProgress::new(Duration::from_secs(40), Duration::from_secs(60));
    let mut run = start(LoadBehavior::Immediate, Some((progress, Some(store))));

    run.handle.bind(CellId(1), source(3)).await.unwrap();
    run.handle
        .visibility(CellId(1), VisibilityState::FullyVisible)
        .await
        .unwrap();
    run.controls.advance(&url(3), Duration::from_secs(41));

    let event = wait_for(&mut run.events, |e| {
        matches!(e, ReelEvent::ContinueWatchingAdded { .. })
    })
    .await;
    assert!(matches!(
        event,
        ReelEvent::ContinueWatchingAdded {
            series_id: 3,
            surface: WatchSurface::Feed,
            ..
        }
    ));

    run.handle.shutdown().await;
    run.task.await.unwrap();

    let reloaded = ContinueWatchingStore::load(db).await.unwrap();
    assert_eq!(reloaded.ids(), &[3]);
}

#[tokio::test]
async fn test_detail_surface_uses_longer_threshold() {
    let progress = WatchProgress::new(Duration::from_secs(40), Duration::from_secs(60));
    let mut run = start(LoadBehavior::Immediate, Some((progress, None)));

    run.handle
        .set_surface(CellId(9), WatchSurface::Detail)
        .await
        .unwrap();
    run.handle.bind(CellId(9), source(4)).await.unwrap();
    run.handle
        .visibility(CellId(9), VisibilityState::FullyVisible)
        .await
        .unwrap();

    // Past the feed threshold but not the detail one
    run.controls.advance(&url(4), Duration::from_secs(45));
    tokio::time::sleep(Duration::from_millis(60)).await;
    let mut early = Vec::new();
    while let Ok(e) = run.events.try_recv() {
        early.push(e);
    }
    assert!(!early
        .iter()
        .any(|e| matches!(e, ReelEvent::ContinueWatchingAdded { .. })));

    run.controls.advance(&url(4), Duration::from_secs(20));
    let event = wait_for(&mut run.events, |e| {
        matches!(e, ReelEvent::ContinueWatchingAdded { .. })
    })
    .await;
    assert!(matches!(
        event,
        ReelEvent::ContinueWatchingAdded {
            series_id: 4,
            surface: WatchSurface::Detail,
            ..
        }
    ));

    run.handle.shutdown().await;
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_rebound_visible_cell_plays_on_next_layout() {
    let run = start(LoadBehavior::Immediate, None);
    let viewport = Rect::new(0.0, 0.0, 400.0, 800.0);

    run.handle.bind(CellId(0), source(1)).await.unwrap();
    run.handle.layout(viewport, frames(0, 1)).await.unwrap();
    assert_eq!(run.handle.cell_state(CellId(0)).await.unwrap(), CellState::Playing);

    run.handle.bind(CellId(0), source(2)).await.unwrap();
    assert_eq!(run.handle.cell_state(CellId(0)).await.unwrap(), CellState::Bound);

    let changes = run.handle.layout(viewport, frames(0, 1)).await.unwrap();
    assert_eq!(changes, vec![(CellId(0), VisibilityState::FullyVisible)]);
    let snap = run.handle.snapshot(CellId(0)).await.unwrap().unwrap();
    assert_eq!(snap.source.url(), url(2));
    assert_eq!(snap.state, PlaybackState::Playing);
    assert_eq!(run.handle.stats().await.unwrap().audible, 1);

    // Same source again keeps the remembered visibility
    run.handle.bind(CellId(0), source(2)).await.unwrap();
    let changes = run.handle.layout(viewport, frames(0, 1)).await.unwrap();
    assert!(changes.is_empty());
    assert_eq!(run.handle.cell_state(CellId(0)).await.unwrap(), CellState::Playing);

    run.handle.shutdown().await;
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_detail_sharing_feed_player_uses_detail_threshold() {
    let progress = WatchProgress::new(Duration::from_secs(40), Duration::from_secs(60));
    let mut run = start(LoadBehavior::Immediate, Some((progress, None)));
    let media = "https://cdn.test/s1/e1.mp4";
    let ep = episode(11, 1, 1, true, Some(media));

    run.handle.bind_episode(CellId(0), ep.clone()).await.unwrap();
    run.handle
        .visibility(CellId(0), VisibilityState::FullyVisible)
        .await
        .unwrap();

    let session = DetailSession::open(
        run.handle.clone(),
        CellId(1000),
        series(1, "Heir", 1),
        vec![ep],
        Arc::new(StaticEntitlement::new(false)),
    )
    .await
    .unwrap();
    // Feed cell and detail cell share one player
    assert_eq!(run.handle.stats().await.unwrap().live, 1);
    assert_eq!(session.state().await.unwrap(), CellState::Playing);

    run.controls.advance(media, Duration::from_secs(45));
    tokio::time::sleep(Duration::from_millis(60)).await;
    let mut early = Vec::new();
    while let Ok(e) = run.events.try_recv() {
        early.push(e);
    }
    assert!(!early
        .iter()
        .any(|e| matches!(e, ReelEvent::ContinueWatchingAdded { .. })));

    run.controls.advance(media, Duration::from_secs(20));
    let event = wait_for(&mut run.events, |e| {
        matches!(e, ReelEvent::ContinueWatchingAdded { .. })
    })
    .await;
    assert!(matches!(
        event,
        ReelEvent::ContinueWatchingAdded {
            series_id: 1,
            surface: WatchSurface::Detail,
            ..
        }
    ));

    run.handle.shutdown().await;
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_reused_cell_falls_back_to_feed_surface() {
    let progress = WatchProgress::new(Duration::from_secs(40), Duration::from_secs(60));
    let mut run = start(LoadBehavior::Immediate, Some((progress, None)));

    run.handle
        .set_surface(CellId(9), WatchSurface::Detail)
        .await
        .unwrap();
    run.handle.bind(CellId(9), source(4)).await.unwrap();
    run.handle.reuse(CellId(9)).await.unwrap();

    run.handle.bind(CellId(9), source(5)).await.unwrap();
    run.handle
        .visibility(CellId(9), VisibilityState::FullyVisible)
        .await
        .unwrap();
    run.controls.advance(&url(5), Duration::from_secs(41));

    let event = wait_for(&mut run.events, |e| {
        matches!(e, ReelEvent::ContinueWatchingAdded { .. })
    })
    .await;
    assert!(matches!(
        event,
        ReelEvent::ContinueWatchingAdded {
            series_id: 5,
            surface: WatchSurface::Feed,
            ..
        }
    ));

    run.handle.shutdown().await;
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_handle_errors_after_shutdown() {
    let run = start(LoadBehavior::Immediate, None);
    run.handle.shutdown().await;
    run.task.await.unwrap();

    let result = run.handle.cell_state(CellId(1)).await;
    assert!(matches!(result, Err(reel_player::Error::DriverGone(_))));
}
