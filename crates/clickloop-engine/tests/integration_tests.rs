use std::{
    path::PathBuf,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use clickloop_engine::{
    BackendError, CapturedInput, Command, EventSink, GlobalListener, InputKind, Notifier,
    RunState, Session, SessionEvent, StopReason, UiEvent, session_channel,
    test_support::{Action, MockBackend, pump_until, recv_ui_until, wait_until},
};
use config::{MacroStep, PlaybackMode, Role, RunLimitKind, Settings, Token};
use crossbeam_channel::{Receiver, Sender, unbounded};
use keytoken::RawKey;

struct Rig {
    session: Session,
    backend: Arc<MockBackend>,
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
    ui: Receiver<UiEvent>,
}

fn rig(settings: Settings) -> Rig {
    rig_with_path(settings, None)
}

fn rig_with_path(settings: Settings, path: Option<PathBuf>) -> Rig {
    let backend = Arc::new(MockBackend::new());
    let (tx, rx) = session_channel();
    let (ui_tx, ui) = unbounded();
    let mut session = Session::new(backend.clone(), settings, Notifier::new(ui_tx), tx.clone());
    if let Some(p) = path {
        session = session.with_settings_path(p);
    }
    Rig {
        session,
        backend,
        tx,
        rx,
        ui,
    }
}

fn tap(t: &str) -> MacroStep {
    MacroStep::KeyPress {
        token: Token::parse(t).unwrap(),
    }
}

fn stopped(s: &Session) -> bool {
    matches!(s.state(), RunState::Stopped(_) | RunState::Failed(_))
}

#[test]
fn stop_lands_within_a_slice_of_a_long_delay() {
    let mut r = rig(Settings {
        delay_seconds: 2.0,
        ..Settings::default()
    });
    assert!(r.session.request_start(PlaybackMode::Autoclick).unwrap());
    assert!(wait_until(Duration::from_secs(2), || r.backend.action_count() == 1));
    // Let the unit settle into its 2s sleep.
    thread::sleep(Duration::from_millis(50));

    let asked = Instant::now();
    r.session.request_stop();
    assert_eq!(r.session.state(), &RunState::Stopping);
    assert!(pump_until(
        &mut r.session,
        &r.rx,
        Duration::from_secs(1),
        stopped
    ));
    assert!(asked.elapsed() < Duration::from_millis(100));
    assert_eq!(
        r.session.state(),
        &RunState::Stopped(StopReason::Cancelled)
    );
    assert_eq!(r.backend.action_count(), 1);
}

#[test]
fn second_start_is_a_no_op() {
    let mut r = rig(Settings {
        delay_seconds: 0.5,
        ..Settings::default()
    });
    assert!(r.session.request_start(PlaybackMode::Autoclick).unwrap());
    let before = r.session.state().clone();
    assert!(!r.session.request_start(PlaybackMode::Autoclick).unwrap());
    assert!(!r.session.request_start(PlaybackMode::Macro).unwrap());
    assert_eq!(r.session.state(), &before);
    r.session.request_stop();
    assert!(pump_until(
        &mut r.session,
        &r.rx,
        Duration::from_secs(1),
        stopped
    ));
    // A new run may start once the previous one has stopped.
    assert!(r.session.request_start(PlaybackMode::Autoclick).unwrap());
    r.session.shutdown();
}

#[test]
fn macro_with_three_loops_runs_three_times() {
    let mut r = rig(Settings {
        macro_steps: vec![tap("a"), MacroStep::delay(0.01), tap("b")],
        macro_loops: 3,
        ..Settings::default()
    });
    assert!(r.session.request_start(PlaybackMode::Macro).unwrap());
    assert!(pump_until(
        &mut r.session,
        &r.rx,
        Duration::from_secs(2),
        stopped
    ));
    assert_eq!(
        r.session.state(),
        &RunState::Stopped(StopReason::Completed)
    );
    let taps: Vec<String> = r
        .backend
        .actions()
        .into_iter()
        .map(|a| match a {
            Action::Tap(t) => t.to_string(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(taps, ["a", "b", "a", "b", "a", "b"]);
}

#[test]
fn unbounded_macro_runs_until_cancelled() {
    let mut r = rig(Settings {
        macro_steps: vec![tap("x"), MacroStep::delay(0.005)],
        macro_loops: 0,
        ..Settings::default()
    });
    assert!(r.session.request_start(PlaybackMode::Macro).unwrap());
    assert!(wait_until(Duration::from_secs(2), || r.backend.action_count() >= 5));
    assert!(r.session.is_run_active());
    r.session.handle(SessionEvent::Command(Command::Toggle));
    assert!(pump_until(
        &mut r.session,
        &r.rx,
        Duration::from_secs(1),
        stopped
    ));
    assert_eq!(
        r.session.state(),
        &RunState::Stopped(StopReason::Cancelled)
    );
}

#[test]
fn empty_macro_never_reaches_running() {
    let mut r = rig(Settings::default());
    r.session
        .handle(SessionEvent::Command(Command::Start(Some(PlaybackMode::Macro))));
    assert!(!pump_until(
        &mut r.session,
        &r.rx,
        Duration::from_millis(50),
        |s| matches!(s.state(), RunState::Running { .. })
    ));
    assert_eq!(r.session.state(), &RunState::Idle);
    assert!(!r.ui.try_iter().any(|e| matches!(e, UiEvent::State(_))));
}

#[test]
fn toggle_hotkey_starts_and_emergency_stops() {
    let mut r = rig(Settings {
        delay_seconds: 0.05,
        ..Settings::default()
    });
    let sink = EventSink::new(r.tx.clone());
    let listener = GlobalListener::spawn(r.backend.clone(), sink).unwrap();
    assert!(wait_until(Duration::from_secs(1), || r.backend.is_listening()));
    drop(listener);

    assert!(r.backend.emit_key(RawKey::Named("F8".into())));
    assert!(pump_until(
        &mut r.session,
        &r.rx,
        Duration::from_secs(1),
        |s| s.is_run_active()
    ));
    assert!(wait_until(Duration::from_secs(1), || r.backend.action_count() >= 2));

    assert!(r.backend.emit_key(RawKey::Char('\u{1b}')));
    assert!(pump_until(
        &mut r.session,
        &r.rx,
        Duration::from_secs(1),
        stopped
    ));
    assert!(recv_ui_until(&r.ui, Duration::from_millis(100), |e| matches!(
        e,
        UiEvent::State(RunState::Stopped(StopReason::Cancelled))
    )));
}

#[test]
fn countdown_is_reported_then_runs() {
    let mut r = rig(Settings {
        start_countdown: 0.2,
        run_mode: RunLimitKind::FixedAmount,
        run_amount: 2,
        delay_seconds: 0.0,
        ..Settings::default()
    });
    assert!(r.session.request_start(PlaybackMode::Autoclick).unwrap());
    assert!(matches!(r.session.state(), RunState::CountingDown { .. }));
    assert!(pump_until(
        &mut r.session,
        &r.rx,
        Duration::from_secs(2),
        stopped
    ));
    assert_eq!(r.backend.action_count(), 2);
    let saw_running = r.ui.try_iter().any(|e| {
        matches!(
            e,
            UiEvent::State(RunState::Running {
                mode: PlaybackMode::Autoclick,
                ..
            })
        )
    });
    assert!(saw_running);
}

#[test]
fn backend_failure_marks_failed_and_session_survives() {
    let mut r = rig(Settings::default());
    r.backend
        .fail_after(0, BackendError::Failed("display gone".into()));
    assert!(r.session.request_start(PlaybackMode::Autoclick).unwrap());
    assert!(pump_until(
        &mut r.session,
        &r.rx,
        Duration::from_secs(1),
        stopped
    ));
    assert_eq!(
        r.session.state(),
        &RunState::Failed("display gone".into())
    );
    // Still usable afterwards.
    assert!(r.session.begin_assignment(Role::Toggle));
}

#[test]
fn safety_abort_is_a_stop_not_a_failure() {
    let mut r = rig(Settings {
        delay_seconds: 0.0,
        ..Settings::default()
    });
    r.backend.fail_after(3, BackendError::SafetyAbort);
    assert!(r.session.request_start(PlaybackMode::Autoclick).unwrap());
    assert!(pump_until(
        &mut r.session,
        &r.rx,
        Duration::from_secs(1),
        stopped
    ));
    assert_eq!(
        r.session.state(),
        &RunState::Stopped(StopReason::SafetyAbort)
    );
    assert_eq!(r.backend.action_count(), 3);
}

#[test]
fn run_uses_snapshot_of_settings() {
    let mut r = rig(Settings {
        macro_steps: vec![tap("a"), MacroStep::delay(0.05)],
        macro_loops: 2,
        ..Settings::default()
    });
    assert!(r.session.request_start(PlaybackMode::Macro).unwrap());
    r.session.clear_macro();
    assert!(r.session.settings().macro_steps.is_empty());
    assert!(pump_until(
        &mut r.session,
        &r.rx,
        Duration::from_secs(2),
        stopped
    ));
    assert_eq!(r.backend.action_count(), 2);
}

#[test]
fn autosave_persists_bindings_and_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let mut r = rig_with_path(Settings::default(), Some(path.clone()));
    r.session.begin_assignment(Role::Emergency);
    r.session.handle(SessionEvent::Input(CapturedInput {
        token: Token::parse("f12").unwrap(),
        kind: InputKind::Key,
        at: Instant::now(),
    }));
    r.backend.set_pointer(11, 22);
    r.session.capture_position();
    let saved = config::load_from_path(&path).unwrap();
    assert_eq!(saved.hotkeys.emergency.as_str(), "f12");
    assert_eq!(saved.fixed_position(), Some((11, 22)));
    assert!(saved.use_fixed_position);
}

#[test]
fn recorded_macro_is_saved_and_replayed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let mut r = rig_with_path(Settings::default(), Some(path.clone()));
    r.session.handle(SessionEvent::Command(Command::StartRecording));
    let t0 = Instant::now();
    for (i, t) in ["h", "i"].iter().enumerate() {
        r.session.handle(SessionEvent::Input(CapturedInput {
            token: Token::parse(t).unwrap(),
            kind: InputKind::Key,
            at: t0 + Duration::from_millis(20 * i as u64),
        }));
    }
    r.session.handle(SessionEvent::Command(Command::StopRecording));
    let saved = config::load_from_path(&path).unwrap();
    assert_eq!(
        saved.macro_steps,
        vec![tap("h"), MacroStep::Delay { seconds: 0.02 }, tap("i")]
    );

    let mut settings = saved;
    settings.mode = PlaybackMode::Macro;
    settings.macro_loops = 1;
    let mut replay = rig(settings);
    replay.session.toggle();
    assert!(pump_until(
        &mut replay.session,
        &replay.rx,
        Duration::from_secs(1),
        stopped
    ));
    assert_eq!(
        replay.backend.actions(),
        vec![
            Action::Tap(Token::parse("h").unwrap()),
            Action::Tap(Token::parse("i").unwrap())
        ]
    );
}
