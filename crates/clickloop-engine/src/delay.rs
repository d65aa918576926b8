//! Humanized delays.

use std::time::Duration;

use rand::Rng;

/// Jittered wait in seconds around `base`.
///
/// With `variation_pct <= 0` the result is exactly `max(0, base)`. Otherwise
/// it is drawn uniformly from `[base - a, base + a]` with
/// `a = base * variation_pct / 100`, then floored at zero. The percentage is
/// expected to be clamped to `[0, 100]` already.
pub fn humanized(base: f64, variation_pct: f64) -> f64 {
    humanized_with(&mut rand::thread_rng(), base, variation_pct)
}

/// [`humanized`] with an explicit random source.
pub fn humanized_with<R: Rng + ?Sized>(rng: &mut R, base: f64, variation_pct: f64) -> f64 {
    let floor = base.max(0.0);
    if !base.is_finite() || base <= 0.0 || variation_pct.is_nan() || variation_pct <= 0.0 {
        return if base.is_finite() { floor } else { 0.0 };
    }
    let amplitude = base * variation_pct / 100.0;
    if !amplitude.is_finite() {
        return floor;
    }
    rng.gen_range((base - amplitude)..=(base + amplitude))
        .max(0.0)
}

/// Convert seconds to a [`Duration`], flooring negatives and NaN at zero and
/// saturating huge values.
pub fn seconds(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
