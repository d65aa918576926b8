//! Immutable run snapshots.

use std::time::Duration;

use keytoken::MouseButton;

use crate::{ClickKind, Error, MacroStep, PlaybackMode, RunLimitKind, Settings};

/// How many actions an autoclick run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLimit {
    /// Until cancelled.
    UntilStop,
    /// Exactly this many click actions; always at least one.
    Count(u32),
}

/// Where autoclick actions land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// Wherever the pointer is at click time.
    Cursor,
    /// Absolute screen coordinates.
    Fixed {
        /// Absolute x.
        x: i32,
        /// Absolute y.
        y: i32,
    },
}

/// Which duration macro delay steps wait for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MacroDelays {
    /// Each step's own recorded duration.
    Recorded,
    /// One fixed duration, in seconds, for every delay step.
    Forced(f64),
}

impl MacroDelays {
    /// Seconds to wait for a delay step that recorded `recorded` seconds.
    pub fn resolve(self, recorded: f64) -> f64 {
        match self {
            Self::Recorded => recorded,
            Self::Forced(s) => s,
        }
    }
}

/// Snapshot of everything a playback unit needs, taken when a run starts.
///
/// The snapshot is detached from [`Settings`]: edits made after a run starts
/// never reach the running unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Which loop to run.
    pub mode: PlaybackMode,
    /// Pre-run countdown.
    pub countdown: Duration,
    /// Autoclick bound.
    pub limit: RunLimit,
    /// Autoclick button.
    pub button: MouseButton,
    /// Autoclick click kind.
    pub click: ClickKind,
    /// Autoclick target.
    pub target: ClickTarget,
    /// Base autoclick delay in seconds.
    pub delay_base: f64,
    /// Autoclick jitter percentage, already clamped to `[0, 100]`.
    pub delay_variation_pct: f64,
    /// Macro delay policy.
    pub macro_delays: MacroDelays,
    /// Macro loop count; `None` loops until stopped.
    pub macro_loops: Option<u32>,
    /// Macro steps in replay order.
    pub steps: Vec<MacroStep>,
}

impl Settings {
    /// Validate the settings and snapshot them for a run of `mode`.
    ///
    /// Fails with the first [`Settings::validate`] error. Nothing is mutated.
    pub fn run_config(&self, mode: PlaybackMode) -> Result<RunConfig, Error> {
        self.validate()?;
        let target = match self.fixed_position() {
            Some((x, y)) if self.use_fixed_position => ClickTarget::Fixed { x, y },
            _ => ClickTarget::Cursor,
        };
        let limit = match self.run_mode {
            RunLimitKind::UntilStop => RunLimit::UntilStop,
            RunLimitKind::FixedAmount => RunLimit::Count(self.run_amount),
        };
        Ok(RunConfig {
            mode,
            countdown: Duration::try_from_secs_f64(self.start_countdown).unwrap_or(Duration::MAX),
            limit,
            button: self.mouse_button,
            click: self.click_type,
            target,
            delay_base: self.delay_seconds,
            delay_variation_pct: self.delay_variation_pct,
            macro_delays: if self.macro_use_recorded_delays {
                MacroDelays::Recorded
            } else {
                MacroDelays::Forced(self.macro_forced_delay)
            },
            macro_loops: (self.macro_loops > 0).then_some(self.macro_loops),
            steps: self.macro_steps.clone(),
        })
    }

    /// Check that a run could start from these settings.
    ///
    /// Fixed positioning needs both coordinates. Loading clamps numbers, so
    /// the range checks only trip on values set programmatically.
    pub fn validate(&self) -> Result<(), Error> {
        if self.use_fixed_position && self.fixed_position().is_none() {
            return Err(Error::validation(
                "fixed_x",
                "fixed position selected but no position captured",
            ));
        }
        check_seconds("start_countdown", self.start_countdown)?;
        check_seconds("delay_seconds", self.delay_seconds)?;
        check_seconds("macro_forced_delay", self.macro_forced_delay)?;
        if !(0.0..=100.0).contains(&self.delay_variation_pct) {
            return Err(Error::validation(
                "delay_variation_pct",
                format!("{} is outside 0..=100", self.delay_variation_pct),
            ));
        }
        if self.run_amount == 0 {
            return Err(Error::validation("run_amount", "must be at least 1"));
        }
        for (i, step) in self.macro_steps.iter().enumerate() {
            if let MacroStep::Delay { seconds } = step {
                check_seconds(&format!("macro_steps[{i}]"), *seconds)?;
            }
        }
        Ok(())
    }
}

fn check_seconds(field: &str, v: f64) -> Result<(), Error> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(Error::validation(
            field,
            format!("{v} is not a non-negative number of seconds"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_position_requires_coordinates() {
        let mut s = Settings {
            use_fixed_position: true,
            fixed_x: Some(5),
            ..Settings::default()
        };
        let err = s.run_config(PlaybackMode::Autoclick).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "fixed_x"));
        s.fixed_y = Some(6);
        let cfg = s.run_config(PlaybackMode::Autoclick).unwrap();
        assert_eq!(cfg.target, ClickTarget::Fixed { x: 5, y: 6 });
    }

    #[test]
    fn snapshot_maps_options() {
        let s = Settings {
            run_mode: RunLimitKind::FixedAmount,
            run_amount: 7,
            macro_use_recorded_delays: false,
            macro_forced_delay: 0.5,
            macro_loops: 3,
            start_countdown: 1.5,
            ..Settings::default()
        };
        let cfg = s.run_config(PlaybackMode::Macro).unwrap();
        assert_eq!(cfg.limit, RunLimit::Count(7));
        assert_eq!(cfg.macro_delays, MacroDelays::Forced(0.5));
        assert_eq!(cfg.macro_delays.resolve(3.0), 0.5);
        assert_eq!(cfg.macro_loops, Some(3));
        assert_eq!(cfg.countdown, Duration::from_millis(1500));
        assert_eq!(cfg.target, ClickTarget::Cursor);
    }

    #[test]
    fn zero_loops_is_unbounded() {
        let cfg = Settings::default()
            .run_config(PlaybackMode::Macro)
            .unwrap();
        assert_eq!(cfg.macro_loops, None);
        assert_eq!(cfg.macro_delays.resolve(0.25), 0.25);
    }

    #[test]
    fn validate_rejects_programmatic_out_of_range() {
        let s = Settings {
            delay_variation_pct: 120.0,
            ..Settings::default()
        };
        assert!(s.validate().is_err());
        let s = Settings {
            delay_seconds: -0.1,
            ..Settings::default()
        };
        assert!(s.run_config(PlaybackMode::Autoclick).is_err());
    }
}
