//! Process-wide run state.

use std::{
    fmt,
    time::{Duration, Instant},
};

use config::PlaybackMode;

/// Counters for an active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Clicks (autoclick) or executed steps (macro).
    pub count: u64,
    /// Completed macro loops.
    pub loops: u32,
    /// When the run body started, after any countdown.
    pub started: Instant,
}

impl Progress {
    /// Fresh counters starting now.
    pub fn new() -> Self {
        Self {
            count: 0,
            loops: 0,
            started: Instant::now(),
        }
    }

    /// Render as `Clicks/Steps: N • Time: mm:ss`.
    pub fn stats_line(&self) -> String {
        let elapsed = self.started.elapsed().as_secs();
        format!(
            "Clicks/Steps: {} • Time: {:02}:{:02}",
            self.count,
            elapsed / 60,
            elapsed % 60
        )
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a run stopped without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ran to its configured end.
    Completed,
    /// Stopped on request.
    Cancelled,
    /// Stopped by the backend fail-safe.
    SafetyAbort,
}

/// The single live run state.
///
/// Only the session transitions it. A run may start from `Idle`, `Stopped`
/// or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    /// Nothing has run yet, or the last start request was a no-op.
    #[default]
    Idle,
    /// Waiting out the start countdown.
    CountingDown {
        /// Mode that will run.
        mode: PlaybackMode,
        /// Time left.
        remaining: Duration,
    },
    /// Performing actions.
    Running {
        /// Mode running.
        mode: PlaybackMode,
        /// Counters.
        progress: Progress,
    },
    /// Cancellation signalled; waiting for the playback thread to finish.
    Stopping,
    /// The last run ended normally.
    Stopped(StopReason),
    /// The last run failed.
    Failed(String),
}

impl RunState {
    /// True when a new run may start.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped(_) | Self::Failed(_))
    }

    /// True while a playback unit is alive.
    pub fn is_active(&self) -> bool {
        !self.can_start()
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Stopped"),
            Self::CountingDown { remaining, .. } => {
                write!(f, "Starting in {:.1}s", remaining.as_secs_f64())
            }
            Self::Running { mode, .. } => write!(f, "Running ({mode})"),
            Self::Stopping => f.write_str("Stopping"),
            Self::Stopped(StopReason::Completed) => f.write_str("Finished"),
            Self::Stopped(StopReason::Cancelled) => f.write_str("Stopped"),
            Self::Stopped(StopReason::SafetyAbort) => f.write_str("Stopped (fail-safe)"),
            Self::Failed(reason) => write!(f, "Error: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_gating() {
        assert!(RunState::Idle.can_start());
        assert!(RunState::Stopped(StopReason::Cancelled).can_start());
        assert!(RunState::Failed("x".into()).can_start());
        assert!(RunState::Stopping.is_active());
        assert!(
            RunState::CountingDown {
                mode: PlaybackMode::Macro,
                remaining: Duration::from_secs(1)
            }
            .is_active()
        );
    }

    #[test]
    fn display() {
        let s = RunState::CountingDown {
            mode: PlaybackMode::Autoclick,
            remaining: Duration::from_millis(2340),
        };
        assert_eq!(s.to_string(), "Starting in 2.3s");
        assert_eq!(
            RunState::Stopped(StopReason::SafetyAbort).to_string(),
            "Stopped (fail-safe)"
        );
    }

    #[test]
    fn stats_line_starts_at_zero() {
        assert_eq!(Progress::new().stats_line(), "Clicks/Steps: 0 • Time: 00:00");
    }
}
