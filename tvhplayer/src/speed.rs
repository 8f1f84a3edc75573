//! Trick-play speed translation.
//!
//! Callers express speed as a pipeline multiplier (2.0 = twice as fast).
//! The server expects a signed rate in hundredths, and only accepts a
//! fixed set of them. Requests are truncated to an integer and looked up
//! in a static table; anything else is refused.

/// Rates the server accepts for a subscription, in hundredths.
pub const SUPPORTED_RATES: [i32; 9] = [-500, -400, -300, -200, 100, 200, 300, 400, 500];

/// Rate used to pause a subscription.
pub const PAUSED_RATE: i32 = 0;

/// Normal playback rate.
pub const NORMAL_RATE: i32 = 100;

const SPEED_TABLE: [(i32, i32); 10] = [
    (0, 100),
    (1, 100),
    (2, 200),
    (4, 300),
    (12, 400),
    (48, 500),
    (-2, -200),
    (-4, -300),
    (-12, -400),
    (-48, -500),
];

pub fn is_supported_rate(rate: i32) -> bool {
    SUPPORTED_RATES.contains(&rate)
}

/// Translates a requested speed into a server rate.
///
/// Returns `None` when the request has no mapping, in which case the
/// caller must leave the current speed untouched.
pub fn translate_speed(requested: f32) -> Option<i32> {
    if !requested.is_finite() {
        return None;
    }
    let key = requested.trunc() as i32;
    SPEED_TABLE
        .iter()
        .find(|(speed, _)| *speed == key)
        .map(|(_, rate)| *rate)
        .or_else(|| is_supported_rate(key).then_some(key))
}

/// Pipeline multiplier for a server rate.
pub fn rate_to_multiplier(rate: i32) -> f32 {
    rate as f32 / 100.0
}
