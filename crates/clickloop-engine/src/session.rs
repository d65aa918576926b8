//! The run coordinator.
//!
//! A [`Session`] owns every piece of mutable state: the settings, the
//! listener's routing mode, the run state and the active playback unit. It
//! runs on one thread and is driven entirely by [`SessionEvent`]s from its
//! inbox, so capture, playback and the presentation layer never touch shared
//! state directly.

use std::{
    path::PathBuf,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use config::{MacroStep, PlaybackMode, Role, Settings, Token};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, trace, warn};

use crate::{
    CapturedInput, Command, InputBackend, ListenerMode, Notifier, Outcome, Result, RunEvent,
    RunState, SessionEvent, StatusSnapshot, UiEvent,
    listener::{Routed, Router},
    playback::{self, RunHandle},
    state::{Progress, StopReason},
};

/// How long shutdown waits for a cancelled playback thread.
pub const SHUTDOWN_WAIT: Duration = Duration::from_millis(250);

/// Poll interval while waiting for a playback thread to exit.
const STOP_POLL_INTERVAL_MS: u64 = 2;

/// Minimum spacing between live progress updates sent to the UI.
pub const PROGRESS_UI_INTERVAL: Duration = Duration::from_millis(100);

/// The owning-thread coordinator.
pub struct Session {
    /// Injection and pointer queries.
    backend: Arc<dyn InputBackend>,
    /// Live settings; runs take snapshots.
    settings: Settings,
    /// Where settings autosave; `None` disables persistence.
    settings_path: Option<PathBuf>,
    /// Input routing.
    router: Router,
    /// The single live run state.
    state: RunState,
    /// The playback unit, if one is alive.
    active: Option<RunHandle>,
    /// Id for the next run.
    next_run_id: u64,
    /// UI channel.
    notifier: Notifier,
    /// Inbox sender handed to playback units.
    inbox: Sender<SessionEvent>,
    /// Leave the loop after the next run ends.
    exit_after_run: bool,
    /// When the last progress update went to the UI.
    last_progress_ui: Option<Instant>,
}

impl Session {
    /// Create a session over `backend` that reports to `notifier` and hands
    /// `inbox` to the playback units it spawns.
    pub fn new(
        backend: Arc<dyn InputBackend>,
        settings: Settings,
        notifier: Notifier,
        inbox: Sender<SessionEvent>,
    ) -> Self {
        Self {
            backend,
            settings,
            settings_path: None,
            router: Router::new(),
            state: RunState::Idle,
            active: None,
            next_run_id: 1,
            notifier,
            inbox,
            exit_after_run: false,
            last_progress_ui: None,
        }
    }

    /// Autosave and save to `path`.
    pub fn with_settings_path(mut self, path: PathBuf) -> Self {
        self.settings_path = Some(path);
        self
    }

    /// Make [`Session::run`] return once the next run ends.
    pub fn exit_after_run(&mut self, yes: bool) {
        self.exit_after_run = yes;
    }

    /// Current run state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current listener mode.
    pub fn listener_mode(&self) -> ListenerMode {
        self.router.mode()
    }

    /// True while a playback thread is alive.
    pub fn is_run_active(&self) -> bool {
        self.active.is_some()
    }

    /// Consume the inbox until `Quit`, then shut down.
    pub fn run(&mut self, rx: &Receiver<SessionEvent>) {
        info!("session_started");
        for ev in rx.iter() {
            if !self.handle(ev) {
                break;
            }
        }
        self.shutdown();
        info!("session_ended");
    }

    /// Apply one event. Returns `false` when the session loop should end.
    pub fn handle(&mut self, ev: SessionEvent) -> bool {
        match ev {
            SessionEvent::Input(input) => {
                self.on_input(&input);
                true
            }
            SessionEvent::Command(cmd) => self.on_command(cmd),
            SessionEvent::Run { run_id, event } => self.on_run_event(run_id, event),
            SessionEvent::CaptureFailed(reason) => {
                self.warn("Hotkeys", format!("Global capture unavailable: {reason}"));
                true
            }
        }
    }

    /// Route one captured input.
    fn on_input(&mut self, input: &CapturedInput) {
        trace!(token = %input.token, "session_input");
        match self.router.route(input, &self.settings.hotkeys) {
            Routed::Assigned { role, token } => self.bind(role, token),
            Routed::Recorded(steps) => {
                for step in steps {
                    self.settings.macro_steps.push(step.clone());
                    self.emit(UiEvent::StepAppended(step));
                }
            }
            Routed::Hotkey(role) => self.on_hotkey(role),
            Routed::Ignored => {}
        }
    }

    /// Act on a hotkey trigger.
    fn on_hotkey(&mut self, role: Role) {
        debug!(%role, "hotkey_triggered");
        match role {
            Role::Emergency => self.request_stop(),
            Role::Toggle => self.toggle(),
            Role::Capture => self.capture_position(),
        }
    }

    /// Apply a presentation command.
    fn on_command(&mut self, cmd: Command) -> bool {
        debug!(?cmd, "session_command");
        match cmd {
            Command::Start(mode) => self.start_reporting(mode.unwrap_or(self.settings.mode)),
            Command::Stop => self.request_stop(),
            Command::Toggle => self.toggle(),
            Command::SetMode(mode) => self.set_mode(mode),
            Command::BeginAssignment(role) => {
                self.begin_assignment(role);
            }
            Command::CancelAssignment => self.cancel_assignment(),
            Command::StartRecording => {
                self.start_recording();
            }
            Command::StopRecording => self.stop_recording(),
            Command::ClearMacro => self.clear_macro(),
            Command::CapturePosition => self.capture_position(),
            Command::Save => self.save(),
            Command::Status => self.emit(UiEvent::Status(self.status())),
            Command::ListSteps => self.emit(UiEvent::Steps(self.settings.macro_steps.clone())),
            Command::Quit => return false,
        }
        true
    }

    /// Apply a playback report. Reports from stale runs are ignored.
    fn on_run_event(&mut self, run_id: u64, event: RunEvent) -> bool {
        let Some(active) = &self.active else {
            trace!(run_id, "run_event_without_active_run");
            return true;
        };
        if active.id != run_id {
            trace!(run_id, active = active.id, "run_event_stale");
            return true;
        }
        let mode = active.mode;
        match event {
            RunEvent::Countdown(remaining) => {
                if matches!(self.state, RunState::CountingDown { .. }) {
                    self.set_state(RunState::CountingDown { mode, remaining });
                }
            }
            RunEvent::Started => {
                // A zero countdown entered Running at start; keep its clock.
                if matches!(self.state, RunState::CountingDown { .. }) {
                    self.set_state(RunState::Running {
                        mode,
                        progress: Progress::new(),
                    });
                }
            }
            RunEvent::Progress { count, loops } => {
                if let RunState::Running { progress, .. } = &mut self.state {
                    progress.count = count;
                    progress.loops = loops;
                    let snapshot = *progress;
                    self.publish_progress(snapshot);
                }
            }
            RunEvent::Finished(outcome) => {
                self.finish_run(outcome);
                return !self.exit_after_run;
            }
        }
        true
    }

    /// Send live counters to the UI, at most once per [`PROGRESS_UI_INTERVAL`].
    fn publish_progress(&mut self, progress: Progress) {
        let now = Instant::now();
        if self
            .last_progress_ui
            .is_some_and(|last| now.duration_since(last) < PROGRESS_UI_INTERVAL)
        {
            return;
        }
        self.last_progress_ui = Some(now);
        self.emit(UiEvent::Progress(progress));
    }

    /// Retire the active unit and publish its outcome.
    fn finish_run(&mut self, outcome: Outcome) {
        if let Some(active) = self.active.take() {
            if active.thread.join().is_err() {
                warn!(run_id = active.id, "run_thread_join_failed");
            }
            info!(run_id = active.id, ?outcome, "run_retired");
        }
        let next = match outcome {
            Outcome::Completed => RunState::Stopped(StopReason::Completed),
            Outcome::Cancelled => RunState::Stopped(StopReason::Cancelled),
            Outcome::SafetyAbort => {
                self.warn("Stopped", "Fail-safe triggered".to_string());
                RunState::Stopped(StopReason::SafetyAbort)
            }
            Outcome::NothingToPlay => {
                self.warn("Macro", "No macro recorded.".to_string());
                RunState::Idle
            }
            Outcome::Failed(reason) => {
                self.error("Run failed", reason.clone());
                RunState::Failed(reason)
            }
        };
        self.set_state(next);
    }

    /// Start a run of `mode`.
    ///
    /// Returns `Ok(false)` without changing anything when a run is already
    /// active, while recording, or when a macro run has no steps. Validation
    /// failures are returned and leave the state untouched.
    pub fn request_start(&mut self, mode: PlaybackMode) -> Result<bool> {
        if !self.state.can_start() || self.active.is_some() {
            debug!(state = ?self.state, "start_rejected_run_active");
            return Ok(false);
        }
        if self.router.is_recording() {
            self.warn("Start", "Finish recording before starting a run.".to_string());
            return Ok(false);
        }
        let cfg = self.settings.run_config(mode)?;
        if mode == PlaybackMode::Macro && cfg.steps.is_empty() {
            self.warn("Macro", "No macro recorded.".to_string());
            return Ok(false);
        }
        self.autosave();
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        let countdown = cfg.countdown;
        let handle = playback::spawn(run_id, cfg, self.backend.clone(), self.inbox.clone())?;
        self.active = Some(handle);
        self.last_progress_ui = None;
        info!(run_id, %mode, countdown_ms = countdown.as_millis() as u64, "run_started");
        self.set_state(if countdown.is_zero() {
            RunState::Running {
                mode,
                progress: Progress::new(),
            }
        } else {
            RunState::CountingDown {
                mode,
                remaining: countdown,
            }
        });
        Ok(true)
    }

    /// [`Session::request_start`], reporting failures to the UI.
    fn start_reporting(&mut self, mode: PlaybackMode) {
        if let Err(e) = self.request_start(mode) {
            warn!(error = %e, "start_failed");
            self.error("Cannot start", e.pretty());
        }
    }

    /// Cancel the active run. Idempotent.
    pub fn request_stop(&mut self) {
        let Some(active) = &self.active else {
            trace!("stop_without_active_run");
            return;
        };
        if !active.cancel.is_cancelled() {
            info!(run_id = active.id, "run_stop_requested");
            active.cancel.cancel();
        }
        if !matches!(self.state, RunState::Stopping) {
            self.set_state(RunState::Stopping);
        }
    }

    /// Stop when a run is active, else start the configured mode.
    pub fn toggle(&mut self) {
        if self.active.is_some() {
            self.request_stop();
        } else {
            self.start_reporting(self.settings.mode);
        }
    }

    /// Change the mode that start and toggle launch.
    pub fn set_mode(&mut self, mode: PlaybackMode) {
        if self.settings.mode != mode {
            self.settings.mode = mode;
            self.emit(UiEvent::ModeChanged(mode));
        }
    }

    /// Bind the next captured input to `role`. Refused while recording.
    pub fn begin_assignment(&mut self, role: Role) -> bool {
        if !self.router.await_assignment(role) {
            self.warn("Hotkey", "Finish recording before assigning a hotkey.".to_string());
            return false;
        }
        debug!(%role, "assignment_started");
        self.emit(UiEvent::Listener(self.router.mode()));
        true
    }

    /// Leave assignment mode without binding.
    pub fn cancel_assignment(&mut self) {
        if let Some(role) = self.router.cancel_assignment() {
            debug!(%role, "assignment_cancelled");
            self.emit(UiEvent::Listener(self.router.mode()));
        }
    }

    /// Replace the binding for `role`.
    fn bind(&mut self, role: Role, token: Token) {
        info!(%role, %token, "hotkey_bound");
        self.settings.hotkeys.set(role, token.clone());
        self.autosave();
        self.emit(UiEvent::Listener(self.router.mode()));
        self.emit(UiEvent::BindingChanged {
            role,
            token: token.clone(),
        });
        self.info("Hotkey", format!("Hotkey set: {}", token.label()));
        let hk = &self.settings.hotkeys;
        for (a, b) in hk.duplicates() {
            let shared = hk.get(a).map(Token::label).unwrap_or_default();
            self.warn(
                "Hotkey",
                format!("{a} and {b} share {shared}; {a} takes priority"),
            );
        }
    }

    /// Start recording, discarding the previous macro.
    ///
    /// Refused while a run is active or a hotkey assignment is pending.
    pub fn start_recording(&mut self) -> bool {
        if self.active.is_some() {
            self.warn("Macro", "Stop the run before recording.".to_string());
            return false;
        }
        if !self.router.start_recording() {
            self.warn("Macro", "Finish the hotkey assignment first.".to_string());
            return false;
        }
        self.settings.macro_steps.clear();
        self.emit(UiEvent::MacroCleared);
        self.emit(UiEvent::Listener(self.router.mode()));
        info!("macro_recording_started");
        true
    }

    /// Finish recording and persist the macro.
    pub fn stop_recording(&mut self) {
        if !self.router.stop_recording() {
            return;
        }
        let steps = self.settings.macro_steps.len();
        info!(steps, "macro_recording_stopped");
        self.autosave();
        self.emit(UiEvent::Listener(self.router.mode()));
        self.success("Macro", format!("Macro recorded ({steps} steps)."));
    }

    /// Discard every recorded step.
    pub fn clear_macro(&mut self) {
        self.settings.macro_steps.clear();
        self.router.reset_recording_clock();
        self.autosave();
        self.emit(UiEvent::MacroCleared);
    }

    /// Replace the macro wholesale.
    pub fn set_macro(&mut self, steps: Vec<MacroStep>) {
        self.settings.macro_steps = steps;
    }

    /// Store the pointer position as the fixed click target.
    pub fn capture_position(&mut self) {
        match self.backend.pointer() {
            Ok((x, y)) => {
                self.settings.capture_position(x, y);
                self.autosave();
                info!(x, y, "position_captured");
                self.info("Position", format!("Position captured at ({x}, {y})."));
            }
            Err(e) => self.error("Position", format!("Could not read the pointer: {e}")),
        }
    }

    /// Validate and persist the settings.
    pub fn save(&mut self) {
        let Some(path) = self.settings_path.clone() else {
            self.warn("Settings", "No settings file configured.".to_string());
            return;
        };
        match config::save_to_path(&self.settings, &path) {
            Ok(()) => self.success("Settings", format!("Saved to {}", path.display())),
            Err(e) => self.error("Settings", e.pretty()),
        }
    }

    /// Persist without validation, logging failures.
    fn autosave(&self) {
        let Some(path) = &self.settings_path else {
            return;
        };
        if let Err(e) = config::write_to_path(&self.settings, path) {
            warn!(error = %e.pretty(), "settings_autosave_failed");
        }
    }

    /// Snapshot for status displays.
    pub fn status(&self) -> StatusSnapshot {
        let hk = &self.settings.hotkeys;
        StatusSnapshot {
            state: self.state.clone(),
            mode: self.settings.mode,
            listener: self.router.mode(),
            toggle: hk.toggle.clone(),
            emergency: hk.emergency.clone(),
            capture: hk.capture.clone(),
            steps: self.settings.macro_steps.len(),
            position: self.settings.position_text(),
        }
    }

    /// Cancel any active run and wait briefly for its thread.
    pub fn shutdown(&mut self) {
        self.request_stop();
        let Some(active) = self.active.take() else {
            return;
        };
        let start = Instant::now();
        while !active.thread.is_finished() && start.elapsed() < SHUTDOWN_WAIT {
            thread::sleep(Duration::from_millis(STOP_POLL_INTERVAL_MS));
        }
        if active.thread.is_finished() {
            let _ignored = active.thread.join();
            debug!(run_id = active.id, "run_joined_on_shutdown");
        } else {
            warn!(run_id = active.id, "run_thread_still_busy_on_shutdown");
        }
        self.set_state(RunState::Stopped(StopReason::Cancelled));
    }

    /// Transition and publish.
    fn set_state(&mut self, next: RunState) {
        if self.state != next {
            trace!(from = ?self.state, to = ?next, "run_state");
            self.state = next;
            self.emit(UiEvent::State(self.state.clone()));
        }
    }

    /// Send to the UI, tolerating a closed channel.
    fn emit(&self, ev: UiEvent) {
        if self.notifier.send(ev).is_err() {
            trace!("ui_channel_closed");
        }
    }

    /// Info notification.
    fn info(&self, title: &str, text: String) {
        let _ignored = self.notifier.info(title, text);
    }

    /// Success notification.
    fn success(&self, title: &str, text: String) {
        let _ignored = self.notifier.success(title, text);
    }

    /// Warning notification.
    fn warn(&self, title: &str, text: String) {
        let _ignored = self.notifier.warn(title, text);
    }

    /// Error notification.
    fn error(&self, title: &str, text: String) {
        let _ignored = self.notifier.error(title, text);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use config::MouseButton;
    use crossbeam_channel::unbounded;
    use keytoken::RawKey;

    use super::*;
    use crate::{
        InputKind, NotifyKind, session_channel,
        test_support::{MockBackend, pump_until},
    };

    struct Harness {
        session: Session,
        backend: Arc<MockBackend>,
        rx: Receiver<SessionEvent>,
        ui: Receiver<UiEvent>,
    }

    fn harness(settings: Settings) -> Harness {
        let backend = Arc::new(MockBackend::new());
        let (tx, rx) = session_channel();
        let (ui_tx, ui) = unbounded();
        let session = Session::new(backend.clone(), settings, Notifier::new(ui_tx), tx);
        Harness {
            session,
            backend,
            rx,
            ui,
        }
    }

    fn key_input(t: &str) -> SessionEvent {
        SessionEvent::Input(CapturedInput {
            token: Token::parse(t).unwrap(),
            kind: InputKind::Key,
            at: Instant::now(),
        })
    }

    fn drain(ui: &Receiver<UiEvent>) -> Vec<UiEvent> {
        ui.try_iter().collect()
    }

    #[test]
    fn assignment_binds_and_notifies() {
        let mut h = harness(Settings::default());
        assert!(h.session.begin_assignment(Role::Toggle));
        h.session.handle(key_input("f6"));
        assert_eq!(h.session.settings().hotkeys.toggle.as_str(), "f6");
        assert_eq!(h.session.listener_mode(), ListenerMode::Idle);
        let events = drain(&h.ui);
        assert!(events.iter().any(|e| matches!(
            e,
            UiEvent::Notify { kind: NotifyKind::Info, text, .. } if text == "Hotkey set: F6"
        )));
        // The assigning input never fires the hotkey it created.
        assert!(!h.session.is_run_active());
    }

    #[test]
    fn recording_clears_and_appends() {
        let mut h = harness(Settings {
            macro_steps: vec![MacroStep::delay(9.0)],
            ..Settings::default()
        });
        assert!(h.session.start_recording());
        assert!(h.session.settings().macro_steps.is_empty());
        h.session.handle(key_input("a"));
        h.session.handle(SessionEvent::Input(CapturedInput {
            token: Token::mouse(MouseButton::Left),
            kind: InputKind::Click {
                button: MouseButton::Left,
                x: 4,
                y: 5,
            },
            at: Instant::now(),
        }));
        h.session.handle(key_input("f8"));
        h.session.stop_recording();
        let steps = &h.session.settings().macro_steps;
        assert_eq!(steps.len(), 5);
        assert!(matches!(steps[0], MacroStep::KeyPress { .. }));
        assert!(matches!(steps[1], MacroStep::Delay { .. }));
        assert!(matches!(steps[2], MacroStep::Click { x: 4, y: 5, .. }));
        // Recording suppressed the toggle hotkey.
        assert!(!h.session.is_run_active());
        assert!(drain(&h.ui).contains(&UiEvent::MacroCleared));
    }

    #[test]
    fn start_refused_while_recording() {
        let mut h = harness(Settings::default());
        h.session.start_recording();
        assert!(!h.session.request_start(PlaybackMode::Autoclick).unwrap());
        assert_eq!(h.session.state(), &RunState::Idle);
    }

    #[test]
    fn validation_error_leaves_state() {
        let mut h = harness(Settings {
            use_fixed_position: true,
            ..Settings::default()
        });
        assert!(h.session.request_start(PlaybackMode::Autoclick).is_err());
        assert_eq!(h.session.state(), &RunState::Idle);
        assert!(!h.session.is_run_active());
    }

    #[test]
    fn empty_macro_stays_idle() {
        let mut h = harness(Settings::default());
        assert!(!h.session.request_start(PlaybackMode::Macro).unwrap());
        assert_eq!(h.session.state(), &RunState::Idle);
        assert!(drain(&h.ui).iter().any(|e| matches!(
            e,
            UiEvent::Notify { kind: NotifyKind::Warn, title, .. } if title == "Macro"
        )));
    }

    #[test]
    fn capture_hotkey_stores_position() {
        let mut settings = Settings::default();
        settings.hotkeys.capture = Token::parse("f9");
        let mut h = harness(settings);
        h.backend.set_pointer(640, 360);
        h.session.handle(key_input("f9"));
        let s = h.session.settings();
        assert!(s.use_fixed_position);
        assert_eq!(s.fixed_position(), Some((640, 360)));
    }

    #[test]
    fn stale_run_events_are_ignored() {
        let mut h = harness(Settings::default());
        assert!(h.session.handle(SessionEvent::Run {
            run_id: 42,
            event: RunEvent::Finished(Outcome::Completed),
        }));
        assert_eq!(h.session.state(), &RunState::Idle);
        h.session.shutdown();
        let _ = h.rx.try_iter().count();
    }

    #[test]
    fn quit_ends_loop() {
        let mut h = harness(Settings::default());
        assert!(!h.session.handle(SessionEvent::Command(Command::Quit)));
        assert!(h.session.handle(SessionEvent::Command(Command::Status)));
        assert!(matches!(drain(&h.ui).last(), Some(UiEvent::Status(_))));
    }

    #[test]
    fn sink_events_reach_router() {
        let h = harness(Settings::default());
        let sink = crate::EventSink::new(h.session.inbox.clone());
        h.backend.listen(sink).unwrap();
        assert!(h.backend.emit_key(RawKey::Named("F8".into())));
        assert!(matches!(h.rx.try_recv(), Ok(SessionEvent::Input(_))));
    }

    #[test]
    fn progress_reaches_ui_while_running() {
        let mut h = harness(Settings {
            delay_seconds: 0.01,
            ..Settings::default()
        });
        assert!(h.session.request_start(PlaybackMode::Autoclick).unwrap());
        pump_until(&mut h.session, &h.rx, Duration::from_millis(300), |_| false);
        let counts: Vec<u64> = drain(&h.ui)
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Progress(p) => Some(p.count),
                _ => None,
            })
            .collect();
        // Throttled: one immediately, then at most one per interval.
        assert!(counts.len() >= 2, "{counts:?}");
        assert!(counts.len() <= 4, "{counts:?}");
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
        assert!(counts.last() > counts.first());
        h.session.shutdown();
    }

    #[test]
    fn zero_countdown_enters_running_once() {
        let mut h = harness(Settings {
            delay_seconds: 0.05,
            ..Settings::default()
        });
        assert!(h.session.request_start(PlaybackMode::Autoclick).unwrap());
        let RunState::Running { progress: first, .. } = h.session.state().clone() else {
            panic!("expected running, got {:?}", h.session.state());
        };
        pump_until(&mut h.session, &h.rx, Duration::from_millis(150), |_| false);
        let RunState::Running { progress, .. } = h.session.state().clone() else {
            panic!("expected running, got {:?}", h.session.state());
        };
        assert_eq!(progress.started, first.started);
        assert!(progress.count > 0);
        let entered = drain(&h.ui)
            .iter()
            .filter(|e| matches!(e, UiEvent::State(RunState::Running { .. })))
            .count();
        assert_eq!(entered, 1);
        h.session.shutdown();
    }

    #[test]
    fn finished_recording_reports_success() {
        let mut h = harness(Settings::default());
        assert!(h.session.start_recording());
        h.session.handle(key_input("a"));
        h.session.stop_recording();
        assert!(drain(&h.ui).iter().any(|e| matches!(
            e,
            UiEvent::Notify { kind: NotifyKind::Success, text, .. }
                if text == "Macro recorded (1 steps)."
        )));
    }
}
