// Defaults and clamp bounds for persisted settings

pub(crate) const START_COUNTDOWN: f64 = 0.0;
pub(crate) const HOTKEY_TOGGLE: &str = "f8";
pub(crate) const HOTKEY_EMERGENCY: &str = "esc";

pub(crate) const DELAY_SECONDS: f64 = 0.20;
pub(crate) const DELAY_VARIATION_PCT: f64 = 0.0;
pub(crate) const RUN_AMOUNT: u32 = 100;

pub(crate) const MACRO_USE_RECORDED_DELAYS: bool = true;
pub(crate) const MACRO_FORCED_DELAY: f64 = 1.0;
/// Zero means loop until stopped.
pub(crate) const MACRO_LOOPS: u32 = 0;

pub(crate) const MAX_VARIATION_PCT: f64 = 100.0;
pub(crate) const MIN_RUN_AMOUNT: u32 = 1;

/// Clamp a seconds value to `>= 0`, mapping non-finite input to `default`.
pub(crate) fn seconds(v: f64, default: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { default }
}

/// Clamp a percentage to `[0, 100]`, mapping non-finite input to `default`.
pub(crate) fn percent(v: f64, default: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, MAX_VARIATION_PCT)
    } else {
        default
    }
}

/// Truncate a JSON number to a `u32` no smaller than `min`.
pub(crate) fn count(v: f64, min: u32, default: u32) -> u32 {
    if !v.is_finite() {
        return default;
    }
    // `as` saturates for out-of-range floats.
    (v.trunc() as u32).max(min)
}

/// Truncate a JSON number to a screen coordinate.
pub(crate) fn coord(v: f64) -> Option<i32> {
    v.is_finite().then(|| v.trunc() as i32)
}
