//! Playback-clock utilities

use std::time::Duration;

/// Format a playback position for a player clock
///
/// `MM:SS` below one hour, `H:MM:SS` from one hour up.
pub fn format_clock(position: Duration) -> String {
    let total = position.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Progress of `position` through `threshold`, clamped to 0.0-1.0
pub fn fraction_of(position: Duration, threshold: Duration) -> f64 {
    if threshold.is_zero() {
        return 1.0;
    }
    (position.as_secs_f64() / threshold.as_secs_f64()).clamp(0.0, 1.0)
}
