//! Playback core
//!
//! - [`controller`]: single-active-video policy and player lifecycle
//! - [`cache`] / [`handle`]: owned player instances
//! - [`backend`]: media framework seam, with [`simulated`] as the in-process
//!   implementation
//! - [`driver`]: the owner task everything else talks to
//! - [`detail`]: detail player on top of the driver

pub mod backend;
pub mod cache;
pub mod controller;
pub mod detail;
pub mod driver;
pub mod handle;
pub mod progress;
pub mod simulated;
pub mod source;
pub mod visibility;

pub use backend::{MediaBackend, MediaEvent, MediaPlayer, ReadinessNotifier, ReadinessReport};
pub use cache::PlayerCache;
pub use controller::{ActivePlayback, FeedPlaybackController};
pub use detail::DetailSession;
pub use driver::{DriverConfig, FeedCommand, FeedDriver, FeedHandle, FeedStats};
pub use handle::{HandleSnapshot, PlayerHandle};
pub use progress::WatchProgress;
pub use simulated::{LoadBehavior, SimPlayerView, SimulatedBackend, SimulatedControls};
pub use source::MediaSource;
pub use visibility::{classify, Rect, VisibilityTracker};
