//! Playback units: the autoclick loop and the macro loop.
//!
//! A unit runs on its own thread with a [`CancellationToken`] checked at
//! every suspension point. It reads only its [`RunConfig`] snapshot and
//! reports back to the session through the inbox. Whatever happens inside,
//! including a panic, the session receives exactly one
//! [`RunEvent::Finished`].

use std::{
    result::Result as StdResult,
    sync::Arc,
    thread::{self, JoinHandle},
};

use config::{ClickKind, ClickTarget, MacroStep, PlaybackMode, RunConfig, RunLimit};
use crossbeam_channel::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    BackendError, InputBackend, Result, RunEvent, SessionEvent, delay,
    pacing::{self, SLEEP_SLICE},
};

/// How a playback unit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The configured amount of work finished.
    Completed,
    /// Cancellation was observed.
    Cancelled,
    /// The backend fail-safe tripped.
    SafetyAbort,
    /// A macro run had no steps; nothing was performed.
    NothingToPlay,
    /// The backend failed, or the unit panicked.
    Failed(String),
}

/// Receives a unit's progress reports.
pub trait RunObserver {
    /// Called for every report except `Finished`.
    fn report(&mut self, event: RunEvent);
}

impl<F: FnMut(RunEvent)> RunObserver for F {
    fn report(&mut self, event: RunEvent) {
        self(event);
    }
}

/// Observer that forwards to the session inbox.
struct Reporter {
    /// Run id attached to every report.
    run_id: u64,
    /// Session inbox.
    tx: Sender<SessionEvent>,
}

impl Reporter {
    /// Deliver a report the session must see.
    fn send(&self, event: RunEvent) {
        let run_id = self.run_id;
        if self.tx.send(SessionEvent::Run { run_id, event }).is_err() {
            debug!(run_id, "run_report_dropped_session_gone");
        }
    }
}

impl RunObserver for Reporter {
    fn report(&mut self, event: RunEvent) {
        match event {
            RunEvent::Started => self.send(event),
            // Countdown and progress are superseded by the next report.
            other => {
                let _ignored = self.tx.try_send(SessionEvent::Run {
                    run_id: self.run_id,
                    event: other,
                });
            }
        }
    }
}

/// Sends `Finished` exactly once, on drop, even during unwinding.
struct FinishGuard {
    /// Report channel.
    reporter: Reporter,
    /// Outcome to report; `None` means the unit never got to set one.
    outcome: Option<Outcome>,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(|| {
            error!(run_id = self.reporter.run_id, "playback_panicked");
            Outcome::Failed("playback thread panicked".to_string())
        });
        self.reporter.send(RunEvent::Finished(outcome));
    }
}

/// A spawned playback unit.
pub struct RunHandle {
    /// Run id.
    pub id: u64,
    /// Mode running.
    pub mode: PlaybackMode,
    /// Cancels the unit.
    pub cancel: CancellationToken,
    /// Playback thread.
    pub thread: JoinHandle<()>,
}

/// Spawn a playback unit for `cfg` on a dedicated thread.
pub fn spawn(
    run_id: u64,
    cfg: RunConfig,
    backend: Arc<dyn InputBackend>,
    tx: Sender<SessionEvent>,
) -> Result<RunHandle> {
    let cancel = CancellationToken::new();
    let unit_cancel = cancel.clone();
    let mode = cfg.mode;
    let thread = thread::Builder::new()
        .name(format!("clickloop-run-{run_id}"))
        .spawn(move || {
            let mut guard = FinishGuard {
                reporter: Reporter { run_id, tx },
                outcome: None,
            };
            let outcome = execute(&cfg, backend.as_ref(), &unit_cancel, &mut guard.reporter);
            info!(run_id, mode = %cfg.mode, ?outcome, "run_finished");
            guard.outcome = Some(outcome);
        })?;
    debug!(run_id, %mode, "run_spawned");
    Ok(RunHandle {
        id: run_id,
        mode,
        cancel,
        thread,
    })
}

/// Run `cfg` to completion on the current thread.
pub fn execute(
    cfg: &RunConfig,
    backend: &dyn InputBackend,
    cancel: &CancellationToken,
    observer: &mut dyn RunObserver,
) -> Outcome {
    let result = match cfg.mode {
        PlaybackMode::Autoclick => autoclick(cfg, backend, cancel, observer),
        PlaybackMode::Macro => macro_loop(cfg, backend, cancel, observer),
    };
    match result {
        Ok(outcome) => outcome,
        Err(BackendError::SafetyAbort) => {
            warn!(backend = backend.name(), "run_safety_abort");
            Outcome::SafetyAbort
        }
        Err(e) => {
            error!(backend = backend.name(), error = %e, "run_backend_failed");
            Outcome::Failed(e.to_string())
        }
    }
}

/// Countdown then `Started`; `false` when cancelled first.
fn prelude(cfg: &RunConfig, cancel: &CancellationToken, observer: &mut dyn RunObserver) -> bool {
    if !pacing::countdown(cfg.countdown, cancel, |remaining| {
        observer.report(RunEvent::Countdown(remaining));
    }) {
        return false;
    }
    observer.report(RunEvent::Started);
    true
}

/// Repeat one click action until cancelled or the limit is reached.
fn autoclick(
    cfg: &RunConfig,
    backend: &dyn InputBackend,
    cancel: &CancellationToken,
    observer: &mut dyn RunObserver,
) -> StdResult<Outcome, BackendError> {
    if !prelude(cfg, cancel, observer) {
        return Ok(Outcome::Cancelled);
    }
    let at = match cfg.target {
        ClickTarget::Cursor => None,
        ClickTarget::Fixed { x, y } => Some((x, y)),
    };
    let limit = match cfg.limit {
        RunLimit::UntilStop => None,
        RunLimit::Count(n) => Some(u64::from(n)),
    };
    let mut count: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        backend.click(cfg.button, cfg.click, at)?;
        count += 1;
        trace!(count, "autoclick_click");
        observer.report(RunEvent::Progress { count, loops: 0 });
        if limit.is_some_and(|n| count >= n) {
            return Ok(Outcome::Completed);
        }
        let wait = delay::humanized(cfg.delay_base, cfg.delay_variation_pct);
        if !pacing::sleep_sliced(delay::seconds(wait), SLEEP_SLICE, cancel) {
            return Ok(Outcome::Cancelled);
        }
    }
}

/// Replay the step sequence for the configured number of loops.
fn macro_loop(
    cfg: &RunConfig,
    backend: &dyn InputBackend,
    cancel: &CancellationToken,
    observer: &mut dyn RunObserver,
) -> StdResult<Outcome, BackendError> {
    if cfg.steps.is_empty() {
        info!("macro_nothing_to_play");
        return Ok(Outcome::NothingToPlay);
    }
    if !prelude(cfg, cancel, observer) {
        return Ok(Outcome::Cancelled);
    }
    let mut count: u64 = 0;
    let mut loops: u32 = 0;
    loop {
        if cfg.macro_loops.is_some_and(|n| loops >= n) {
            return Ok(Outcome::Completed);
        }
        for step in &cfg.steps {
            if cancel.is_cancelled() {
                return Ok(Outcome::Cancelled);
            }
            match step {
                MacroStep::Delay { seconds } => {
                    let wait = delay::seconds(cfg.macro_delays.resolve(*seconds));
                    if !pacing::sleep_sliced(wait, SLEEP_SLICE, cancel) {
                        return Ok(Outcome::Cancelled);
                    }
                }
                MacroStep::KeyPress { token } => backend.tap(token)?,
                MacroStep::Click { button, x, y } => {
                    backend.click(*button, ClickKind::Single, Some((*x, *y)))?;
                }
            }
            count += 1;
            observer.report(RunEvent::Progress { count, loops });
        }
        loops = loops.saturating_add(1);
        trace!(loops, "macro_loop_done");
        observer.report(RunEvent::Progress { count, loops });
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use config::{MacroDelays, MouseButton, Settings, Token};

    use super::*;
    use crate::test_support::{Action, MockBackend};

    fn macro_cfg(steps: Vec<MacroStep>, loops: u32) -> RunConfig {
        let settings = Settings {
            macro_steps: steps,
            macro_loops: loops,
            ..Settings::default()
        };
        settings.run_config(PlaybackMode::Macro).unwrap()
    }

    fn tap(t: &str) -> MacroStep {
        MacroStep::KeyPress {
            token: Token::parse(t).unwrap(),
        }
    }

    #[test]
    fn macro_runs_exact_loop_count() {
        let backend = MockBackend::new();
        let cfg = macro_cfg(
            vec![
                tap("a"),
                MacroStep::delay(0.0),
                MacroStep::Click {
                    button: MouseButton::Right,
                    x: 1,
                    y: 2,
                },
            ],
            3,
        );
        let mut events = Vec::new();
        let outcome = execute(&cfg, &backend, &CancellationToken::new(), &mut |e: RunEvent| {
            events.push(e)
        });
        assert_eq!(outcome, Outcome::Completed);
        let actions = backend.actions();
        assert_eq!(actions.len(), 6);
        assert_eq!(actions[0], Action::Tap(Token::parse("a").unwrap()));
        assert_eq!(
            actions[1],
            Action::Click {
                button: MouseButton::Right,
                kind: ClickKind::Single,
                at: Some((1, 2)),
            }
        );
        assert_eq!(
            events.last(),
            Some(&RunEvent::Progress { count: 9, loops: 3 })
        );
        assert_eq!(events.first(), Some(&RunEvent::Started));
    }

    #[test]
    fn empty_macro_never_starts() {
        let backend = MockBackend::new();
        let cfg = macro_cfg(Vec::new(), 0);
        let mut events = Vec::new();
        let outcome = execute(&cfg, &backend, &CancellationToken::new(), &mut |e: RunEvent| {
            events.push(e)
        });
        assert_eq!(outcome, Outcome::NothingToPlay);
        assert!(events.is_empty());
        assert!(backend.actions().is_empty());
    }

    #[test]
    fn forced_delay_overrides_recorded() {
        let backend = MockBackend::new();
        let mut cfg = macro_cfg(vec![MacroStep::delay(30.0), tap("b")], 1);
        cfg.macro_delays = MacroDelays::Forced(0.0);
        let outcome = execute(&cfg, &backend, &CancellationToken::new(), &mut |_: RunEvent| {});
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(backend.actions().len(), 1);
    }

    #[test]
    fn autoclick_fixed_amount_at_fixed_position() {
        let backend = MockBackend::new();
        let settings = Settings {
            run_mode: config::RunLimitKind::FixedAmount,
            run_amount: 4,
            delay_seconds: 0.0,
            click_type: ClickKind::Double,
            use_fixed_position: true,
            fixed_x: Some(100),
            fixed_y: Some(200),
            ..Settings::default()
        };
        let cfg = settings.run_config(PlaybackMode::Autoclick).unwrap();
        let outcome = execute(&cfg, &backend, &CancellationToken::new(), &mut |_: RunEvent| {});
        assert_eq!(outcome, Outcome::Completed);
        let actions = backend.actions();
        assert_eq!(actions.len(), 4);
        assert!(actions.iter().all(|a| *a
            == Action::Click {
                button: MouseButton::Left,
                kind: ClickKind::Double,
                at: Some((100, 200)),
            }));
    }

    #[test]
    fn safety_abort_is_distinct_from_failure() {
        let backend = MockBackend::new();
        backend.fail_after(2, BackendError::SafetyAbort);
        let cfg = macro_cfg(vec![tap("a")], 0);
        let outcome = execute(&cfg, &backend, &CancellationToken::new(), &mut |_: RunEvent| {});
        assert_eq!(outcome, Outcome::SafetyAbort);
        assert_eq!(backend.actions().len(), 2);

        let backend = MockBackend::new();
        backend.fail_after(0, BackendError::Failed("no display".into()));
        let cfg = Settings::default()
            .run_config(PlaybackMode::Autoclick)
            .unwrap();
        let outcome = execute(&cfg, &backend, &CancellationToken::new(), &mut |_: RunEvent| {});
        assert_eq!(outcome, Outcome::Failed("no display".into()));
    }

    #[test]
    fn cancelled_countdown_performs_nothing() {
        let backend = MockBackend::new();
        let mut cfg = macro_cfg(vec![tap("a")], 1);
        cfg.countdown = Duration::from_secs(10);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = execute(&cfg, &backend, &cancel, &mut |_: RunEvent| {});
        assert_eq!(outcome, Outcome::Cancelled);
        assert!(backend.actions().is_empty());
    }

    #[test]
    fn spawned_unit_reports_finished_once() {
        let backend = Arc::new(MockBackend::new());
        let (tx, rx) = crate::session_channel();
        let cfg = macro_cfg(vec![tap("a")], 2);
        let handle = spawn(7, cfg, backend, tx).unwrap();
        handle.thread.join().unwrap();
        let finished: Vec<_> = rx
            .try_iter()
            .filter_map(|ev| match ev {
                SessionEvent::Run {
                    run_id,
                    event: RunEvent::Finished(o),
                } => Some((run_id, o)),
                _ => None,
            })
            .collect();
        assert_eq!(finished, vec![(7, Outcome::Completed)]);
    }
}
