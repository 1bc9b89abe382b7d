//! Unit conversions for display values
//!
//! The estimator works in feet and feet/second; everything a rider reads
//! is derived from those through these functions.

/// Feet per second to miles per hour
pub const FPS_TO_MPH: f32 = 0.681818;

/// Feet to miles
pub const FEET_TO_MILES: f32 = 0.000189394;

/// Convert a speed in feet/second to miles/hour.
pub fn fps_to_mph(feet_per_second: f32) -> f32 {
    feet_per_second * FPS_TO_MPH
}

/// Convert a distance in feet to miles.
pub fn feet_to_miles(feet: f32) -> f32 {
    feet * FEET_TO_MILES
}

/// Wheel revolutions per minute for a given ground speed.
///
/// Returns zero for a non-positive circumference.
pub fn fps_to_rpm(feet_per_second: f32, circumference_ft: f32) -> f32 {
    if circumference_ft <= 0.0 {
        return 0.0;
    }
    feet_per_second / circumference_ft * 60.0
}

/// Split a millisecond duration into whole hours, minutes and seconds.
pub const fn split_hms(elapsed_ms: u64) -> (u64, u8, u8) {
    let secs = elapsed_ms / 1000;
    let hours = secs / 3600;
    let minutes = ((secs / 60) % 60) as u8;
    let seconds = (secs % 60) as u8;
    (hours, minutes, seconds)
}
