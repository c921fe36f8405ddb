//! Pure numeric bounds for player parameters
//!
//! Kept free of any parsing or engine concern so each bound is testable on
//! its own. Every check runs before the first engine call of an operation.

use crate::error::{PlaybackError, Result};

/// Smallest accepted seek jump, in seconds.
pub const MIN_SEEK_DELTA_SECS: u32 = 20;

/// Inclusive playback speed range.
pub const SPEED_RANGE: (f64, f64) = (0.5, 4.0);

/// Inclusive volume range in percent. 0 is categorically rejected; muting
/// is its own operation.
pub const VOLUME_RANGE: (u32, u32) = (1, 200);

/// Validate a playback speed factor.
pub fn check_speed(factor: f64) -> Result<()> {
    let (min, max) = SPEED_RANGE;
    if (min..=max).contains(&factor) {
        Ok(())
    } else {
        Err(PlaybackError::OutOfRange(format!(
            "speed {factor} not in [{min}, {max}]"
        )))
    }
}

/// Validate a volume percentage.
pub fn check_volume(percent: u32) -> Result<()> {
    let (min, max) = VOLUME_RANGE;
    if (min..=max).contains(&percent) {
        Ok(())
    } else {
        Err(PlaybackError::OutOfRange(format!(
            "volume {percent} not in [{min}, {max}]"
        )))
    }
}

/// Validate a seek delta against the minimum threshold.
pub fn check_seek_delta(delta_secs: u32) -> Result<()> {
    if delta_secs >= MIN_SEEK_DELTA_SECS {
        Ok(())
    } else {
        Err(PlaybackError::OutOfRange(format!(
            "seek delta {delta_secs}s below minimum {MIN_SEEK_DELTA_SECS}s"
        )))
    }
}

/// Compute the absolute seek target, rejecting jumps at or past the end of
/// the track.
pub fn seek_target(elapsed_secs: u32, delta_secs: u32, duration_secs: u32) -> Result<u32> {
    let target = elapsed_secs.saturating_add(delta_secs);
    if target >= duration_secs {
        return Err(PlaybackError::OutOfRange(format!(
            "seek target {target}s at or past track end {duration_secs}s"
        )));
    }
    Ok(target)
}
