//! Reel Player (reel-player) - command-line front end
//!
//! Browses the catalog backend, decodes media URLs, manages the local
//! "continue watching" list and runs a simulated discover feed through the
//! playback core.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reel_common::config::{resolve_root_folder, TomlConfig};
use reel_common::events::{CellId, EventBus};
use reel_common::model::{Catalog, Episode, Series};
use reel_common::obfuscation;
use reel_common::time::{format_clock, fraction_of};
use reel_player::catalog::{self, FeedItem};
use reel_player::db::{init_database, ContinueWatchingStore};
use reel_player::playback::{
    DetailSession, DriverConfig, FeedDriver, FeedHandle, FeedPlaybackController, LoadBehavior,
    PlayerCache, Rect, SimulatedBackend, WatchProgress,
};
use reel_player::services::{ContentClient, StaticEntitlement};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for reel-player
#[derive(Parser, Debug)]
#[command(name = "reel-player")]
#[command(about = "Short-drama feed player core")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "REEL_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the local database
    #[arg(short, long, env = "REEL_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the catalog grouped by category
    Catalog,

    /// Search series titles
    Search {
        query: String,
    },

    /// List the episodes of a series
    Episodes {
        series_id: i64,
    },

    /// List favourite series
    Favorites,

    /// Toggle the favourite flag of a series
    Favorite {
        series_id: i64,
    },

    /// Decode an obfuscated media URL
    Decode {
        blob: String,

        /// Key override (defaults to media.url_key)
        #[arg(long)]
        key: Option<String>,
    },

    /// Run the discover feed on the simulated media backend
    FeedDemo {
        /// Use generated items instead of the catalog backend
        #[arg(long)]
        offline: bool,

        /// Number of feed items to scroll through
        #[arg(long, default_value = "4")]
        items: usize,

        /// Seconds spent on each item
        #[arg(long, default_value = "2")]
        dwell: u64,
    },

    /// Play a series in the detail player on the simulated backend
    DetailDemo {
        series_id: i64,

        /// Seconds per episode
        #[arg(long, default_value = "2")]
        dwell: u64,
    },

    /// Manage the "continue watching" list
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// Show remembered series
    List,
    /// Forget a series
    Remove { series_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config, args.log_level.as_deref())?;

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    debug!("Root folder: {}", root_folder.display());

    match args.command {
        Command::Catalog => show_catalog(&config).await,
        Command::Search { query } => search(&config, &query).await,
        Command::Episodes { series_id } => show_episodes(&config, series_id).await,
        Command::Favorites => show_favorites(&config).await,
        Command::Favorite { series_id } => toggle_favorite(&config, series_id).await,
        Command::Decode { blob, key } => {
            let key = key.unwrap_or_else(|| config.media.url_key.clone());
            let url = obfuscation::reveal(&blob, &key).context("Failed to decode media URL")?;
            println!("{}", url);
            Ok(())
        }
        Command::FeedDemo {
            offline,
            items,
            dwell,
        } => feed_demo(&config, &root_folder, offline, items, dwell).await,
        Command::DetailDemo { series_id, dwell } => {
            detail_demo(&config, &root_folder, series_id, dwell).await
        }
        Command::History { action } => history(&config, &root_folder, action).await,
    }
}

fn init_tracing(config: &TomlConfig, level_override: Option<&str>) -> Result<()> {
    let level = level_override.unwrap_or(&config.logging.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("reel_player={0},reel_common={0}", level).into());

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

fn client(config: &TomlConfig) -> Result<ContentClient> {
    config
        .validate_api()
        .context("Catalog backend is not configured")?;
    ContentClient::new(&config.api).context("Failed to create catalog client")
}

async fn fetch_catalog(config: &TomlConfig) -> Result<Catalog> {
    client(config)?
        .fetch_catalog()
        .await
        .context("Failed to fetch catalog")
}

async fn open_store(config: &TomlConfig, root_folder: &Path) -> Result<ContinueWatchingStore> {
    let db_path = config.database_path(root_folder);
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    ContinueWatchingStore::load(pool)
        .await
        .context("Failed to load continue-watching list")
}

fn print_series(series: &Series) {
    let fav = if series.is_favourite { " *" } else { "" };
    println!(
        "  [{}] {} ({} episodes){}",
        series.id, series.title, series.total_episodes, fav
    );
}

async fn show_catalog(config: &TomlConfig) -> Result<()> {
    let fetched = fetch_catalog(config).await?;
    for group in catalog::group_by_category(&fetched.series, &fetched.categories) {
        println!("{} ({})", group.category.title, group.series.len());
        for series in &group.series {
            print_series(series);
        }
    }
    Ok(())
}

async fn search(config: &TomlConfig, query: &str) -> Result<()> {
    let fetched = fetch_catalog(config).await?;
    let found = catalog::search(&fetched.series, query);
    if found.is_empty() {
        println!("No series match '{}'", query);
    }
    for series in found {
        print_series(series);
    }
    Ok(())
}

async fn show_favorites(config: &TomlConfig) -> Result<()> {
    let fetched = fetch_catalog(config).await?;
    for series in catalog::favorites(&fetched.series) {
        print_series(series);
    }
    Ok(())
}

async fn show_episodes(config: &TomlConfig, series_id: i64) -> Result<()> {
    let episodes = client(config)?
        .fetch_episodes(series_id)
        .await
        .context("Failed to fetch episodes")?;
    for episode in episodes {
        let access = if episode.is_free { "free" } else { "paid" };
        println!(
            "  #{:<3} id={} {} likes={}",
            episode.episode, episode.id, access, episode.total_likes
        );
    }
    Ok(())
}

async fn toggle_favorite(config: &TomlConfig, series_id: i64) -> Result<()> {
    let series = client(config)?
        .toggle_favorite(series_id)
        .await
        .context("Failed to toggle favourite")?;
    print_series(&series);
    Ok(())
}

async fn history(config: &TomlConfig, root_folder: &Path, action: HistoryAction) -> Result<()> {
    let mut store = open_store(config, root_folder).await?;
    match action {
        HistoryAction::List => {
            if store.is_empty() {
                println!("Continue watching is empty");
            }
            for id in store.ids() {
                println!("  {}", id);
            }
        }
        HistoryAction::Remove { series_id } => {
            if store.remove(series_id).await? {
                println!("Removed {}", series_id);
            } else {
                println!("{} was not in the list", series_id);
            }
        }
    }
    Ok(())
}

/// Start a driver on the simulated backend with progress tracking
fn start_driver(
    config: &TomlConfig,
    store: ContinueWatchingStore,
    events: &EventBus,
) -> (FeedHandle, tokio::task::JoinHandle<()>) {
    let backend = SimulatedBackend::new(LoadBehavior::Immediate).realtime();
    let (controller, readiness_rx) =
        FeedPlaybackController::new(PlayerCache::new(), Box::new(backend), events.clone());
    FeedDriver::new(
        controller,
        readiness_rx,
        events.clone(),
        DriverConfig::from_config(config),
    )
    .with_progress(WatchProgress::from_config(&config.watch), Some(store))
    .spawn()
}

/// Print every event until the bus closes
fn log_events(events: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => println!("event: {}", json),
                    Err(_) => println!("event: {}", event.event_type()),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event log lagged, {} events skipped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn offline_items(count: usize, key: &str) -> Result<Vec<FeedItem>> {
    (0..count)
        .map(|i| {
            let id = i as i64 + 1;
            let url = format!("https://media.invalid/series-{}/ep-1.mp4", id);
            let blob = obfuscation::conceal(&url, key).context("Failed to encode demo URL")?;
            Ok(FeedItem {
                series: Series {
                    id,
                    pos: None,
                    title: format!("Demo series {}", id),
                    description: String::new(),
                    cover: String::new(),
                    category_id: 0,
                    tag_id: 0,
                    total_episodes: 1,
                    is_auto_unlock: false,
                    is_favourite: false,
                },
                episode: Episode {
                    id: id * 100,
                    series_id: id,
                    episode: 1,
                    price: 0,
                    is_free: true,
                    is_available: true,
                    total_likes: 0,
                    is_liked: None,
                    media_blob: Some(blob),
                },
            })
        })
        .collect()
}

async fn feed_demo(
    config: &TomlConfig,
    root_folder: &Path,
    offline: bool,
    items: usize,
    dwell: u64,
) -> Result<()> {
    let mut config = config.clone();
    let feed = if offline {
        if config.media.url_key.is_empty() {
            config.media.url_key = "demo".to_string();
        }
        offline_items(items, &config.media.url_key)?
    } else {
        let client = client(&config)?;
        let fetched = client
            .fetch_catalog()
            .await
            .context("Failed to fetch catalog")?;
        let mut feed = catalog::assemble_feed(&client, &fetched).await;
        feed.truncate(items);
        feed
    };
    if feed.is_empty() {
        bail!("Feed is empty");
    }

    let events = EventBus::default();
    let printer = log_events(&events);
    let store = open_store(&config, root_folder).await?;
    let (handle, task) = start_driver(&config, store, &events);

    // One full-screen cell per item, stacked vertically
    let viewport = Rect::new(0.0, 0.0, 390.0, 844.0);
    for (i, item) in feed.iter().enumerate() {
        handle
            .bind_episode(CellId(i as u64), item.episode.clone())
            .await?;
    }

    for current in 0..feed.len() {
        info!(title = %feed[current].series.title, "Scrolled to item");
        let frames = (0..feed.len())
            .map(|i| {
                let y = (i as f64 - current as f64) * viewport.height;
                (CellId(i as u64), Rect::new(0.0, y, viewport.width, viewport.height))
            })
            .collect();
        handle.layout(viewport, frames).await?;
        tokio::time::sleep(Duration::from_secs(dwell)).await;

        let stats = handle.stats().await?;
        let position = handle
            .snapshot(CellId(current as u64))
            .await?
            .map(|snap| snap.position)
            .unwrap_or_default();
        println!(
            "item {} at {}: cached={} live={} audible={}",
            current,
            format_clock(position),
            stats.cached,
            stats.live,
            stats.audible
        );
    }

    let released = handle.teardown().await?;
    println!("released {} players", released);
    handle.shutdown().await;
    task.await.context("Feed driver panicked")?;
    drop(events);
    printer.abort();
    Ok(())
}

async fn detail_demo(
    config: &TomlConfig,
    root_folder: &Path,
    series_id: i64,
    dwell: u64,
) -> Result<()> {
    let client = client(config)?;
    let series = client
        .fetch_series(series_id)
        .await
        .context("Failed to fetch series")?;
    let episodes = client
        .fetch_episodes(series_id)
        .await
        .context("Failed to fetch episodes")?;

    let events = EventBus::default();
    let printer = log_events(&events);
    let store = open_store(config, root_folder).await?;
    let (handle, task) = start_driver(config, store, &events);
    let entitlement = Arc::new(StaticEntitlement::new(config.entitlement.unlocked));
    let detail_threshold = config.watch.detail_threshold();

    let mut session = DetailSession::open(
        handle.clone(),
        CellId(u64::MAX),
        series,
        episodes,
        entitlement,
    )
    .await
    .context("Failed to open detail player")?;

    loop {
        let (number, total) = session.episode_position();
        println!("{}: episode {} / {}", session.series().title, number, total);
        tokio::time::sleep(Duration::from_secs(dwell)).await;

        if let Some(snap) = session.snapshot().await? {
            println!(
                "  watched {} ({:.0}% of threshold)",
                format_clock(snap.position),
                fraction_of(snap.position, detail_threshold) * 100.0
            );
        }

        match session.next_episode().await {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(reel_player::Error::Paywalled(episode_id)) => {
                println!("episode {} requires a subscription", episode_id);
                break;
            }
            Err(e) => return Err(e).context("Failed to switch episode"),
        }
    }

    session.close().await?;
    handle.shutdown().await;
    task.await.context("Feed driver panicked")?;
    drop(events);
    printer.abort();
    Ok(())
}
