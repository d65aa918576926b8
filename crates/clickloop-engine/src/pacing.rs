//! Cancellable waits.
//!
//! Every suspension point in a run sleeps in short slices and checks the
//! run's [`CancellationToken`] between them, so a stop request lands within
//! about one slice no matter how long the wait.

use std::{
    thread,
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Longest uninterrupted sleep inside a run.
pub const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Interval between countdown reports.
pub const COUNTDOWN_TICK: Duration = Duration::from_millis(50);

/// Sleep for `total` in slices of at most `slice`.
///
/// Returns `true` when the full duration elapsed and `false` as soon as
/// `cancel` is observed.
pub fn sleep_sliced(total: Duration, slice: Duration, cancel: &CancellationToken) -> bool {
    let start = Instant::now();
    let slice = slice.max(Duration::from_millis(1));
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let remaining = total.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return true;
        }
        thread::sleep(remaining.min(slice));
    }
}

/// Run a countdown of `total`, calling `on_tick` with the remaining time
/// every [`COUNTDOWN_TICK`].
///
/// A zero countdown returns immediately without ticking. Returns `false`
/// when cancelled before the countdown ran out.
pub fn countdown<F>(total: Duration, cancel: &CancellationToken, mut on_tick: F) -> bool
where
    F: FnMut(Duration),
{
    if total.is_zero() {
        return !cancel.is_cancelled();
    }
    let start = Instant::now();
    loop {
        if cancel.is_cancelled() {
            trace!("countdown_cancelled");
            return false;
        }
        let remaining = total.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return true;
        }
        on_tick(remaining);
        if !sleep_sliced(remaining.min(COUNTDOWN_TICK), SLEEP_SLICE, cancel) {
            trace!("countdown_cancelled");
            return false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_sleep_elapses() {
        let cancel = CancellationToken::new();
        let start = Instant::now();
        assert!(sleep_sliced(Duration::from_millis(60), SLEEP_SLICE, &cancel));
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn cancel_interrupts_long_sleep() {
        let cancel = CancellationToken::new();
        let c = cancel.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            c.cancel();
        });
        let start = Instant::now();
        assert!(!sleep_sliced(Duration::from_secs(2), SLEEP_SLICE, &cancel));
        assert!(start.elapsed() < Duration::from_millis(500));
        stopper.join().unwrap();
    }

    #[test]
    fn countdown_ticks_down() {
        let cancel = CancellationToken::new();
        let mut ticks = Vec::new();
        assert!(countdown(Duration::from_millis(160), &cancel, |r| ticks.push(r)));
        assert!(ticks.len() >= 2);
        assert!(ticks.windows(2).all(|w| w[0] >= w[1]));
        assert!(ticks.iter().all(|r| *r <= Duration::from_millis(160)));
    }

    #[test]
    fn zero_countdown_skips() {
        let cancel = CancellationToken::new();
        let mut ticked = false;
        assert!(countdown(Duration::ZERO, &cancel, |_| ticked = true));
        assert!(!ticked);
        cancel.cancel();
        assert!(!countdown(Duration::from_secs(5), &cancel, |_| {}));
    }
}
