//! Test support utilities for clickloop-engine unit and integration tests.
//! These helpers are public so integration tests and downstream crates can
//! drive a [`Session`] without touching real input devices.

use std::{
    thread,
    time::{Duration, Instant},
};

use config::ClickKind;
use crossbeam_channel::Receiver;
use keytoken::{MouseButton, RawKey, Token};
use parking_lot::Mutex;

use crate::{BackendError, EventSink, InputBackend, Session, SessionEvent, UiEvent};

/// One injected action recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Pointer moved.
    Move {
        /// Target x.
        x: i32,
        /// Target y.
        y: i32,
    },
    /// Click performed.
    Click {
        /// Button.
        button: MouseButton,
        /// Single or double.
        kind: ClickKind,
        /// Explicit position, if any.
        at: Option<(i32, i32)>,
    },
    /// Key tapped.
    Tap(Token),
}

/// In-memory backend: records actions, serves a scripted pointer, and lets
/// tests inject captured input.
#[derive(Default)]
pub struct MockBackend {
    /// Every successful action, in order.
    actions: Mutex<Vec<Action>>,
    /// Reported pointer position.
    pointer: Mutex<(i32, i32)>,
    /// Sink registered by `listen`.
    sink: Mutex<Option<EventSink>>,
    /// Fail every action once this many have succeeded.
    fail_after: Mutex<Option<(usize, BackendError)>>,
}

impl MockBackend {
    /// A backend with the pointer at the origin and no failures scheduled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded actions.
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().clone()
    }

    /// Number of recorded actions.
    pub fn action_count(&self) -> usize {
        self.actions.lock().len()
    }

    /// Set the position `pointer` reports.
    pub fn set_pointer(&self, x: i32, y: i32) {
        *self.pointer.lock() = (x, y);
    }

    /// After `n` successful actions, fail every further action with `err`.
    pub fn fail_after(&self, n: usize, err: BackendError) {
        *self.fail_after.lock() = Some((n, err));
    }

    /// True once `listen` has registered a sink.
    pub fn is_listening(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Inject a captured key-down. Returns whether a token was forwarded.
    pub fn emit_key(&self, raw: RawKey) -> bool {
        self.sink.lock().as_ref().is_some_and(|s| s.key(&raw))
    }

    /// Inject a captured mouse transition at the current pointer position.
    pub fn emit_mouse(&self, button: &str, pressed: bool) -> bool {
        let (x, y) = *self.pointer.lock();
        self.sink
            .lock()
            .as_ref()
            .is_some_and(|s| s.mouse(button, pressed, x, y))
    }

    /// Record `action` unless a failure is due.
    fn perform(&self, action: Action) -> Result<(), BackendError> {
        let mut actions = self.actions.lock();
        if let Some((n, err)) = &*self.fail_after.lock()
            && actions.len() >= *n
        {
            return Err(err.clone());
        }
        actions.push(action);
        Ok(())
    }
}

impl InputBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn listen(&self, sink: EventSink) -> Result<(), BackendError> {
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn pointer(&self) -> Result<(i32, i32), BackendError> {
        Ok(*self.pointer.lock())
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), BackendError> {
        self.perform(Action::Move { x, y })?;
        *self.pointer.lock() = (x, y);
        Ok(())
    }

    fn click(
        &self,
        button: MouseButton,
        kind: ClickKind,
        at: Option<(i32, i32)>,
    ) -> Result<(), BackendError> {
        self.perform(Action::Click { button, kind, at })
    }

    fn tap(&self, token: &Token) -> Result<(), BackendError> {
        self.perform(Action::Tap(token.clone()))
    }
}

/// Feed inbox events to `session` until `pred` holds or `timeout` elapses.
///
/// Returns whether the predicate was satisfied.
pub fn pump_until<F>(
    session: &mut Session,
    rx: &Receiver<SessionEvent>,
    timeout: Duration,
    mut pred: F,
) -> bool
where
    F: FnMut(&Session) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if pred(session) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let wait = (deadline - now).min(Duration::from_millis(2));
        if let Ok(ev) = rx.recv_timeout(wait) {
            session.handle(ev);
        }
    }
}

/// Feed every queued inbox event to `session` without waiting.
pub fn pump_pending(session: &mut Session, rx: &Receiver<SessionEvent>) {
    while let Ok(ev) = rx.try_recv() {
        session.handle(ev);
    }
}

/// Drain UI events until `pred` matches or `timeout` elapses.
pub fn recv_ui_until<F>(rx: &Receiver<UiEvent>, timeout: Duration, mut pred: F) -> bool
where
    F: FnMut(&UiEvent) -> bool,
{
    let deadline = Instant::now() + timeout;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(ev) if pred(&ev) => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
    false
}

/// Wait until `pred` holds, polling every 2ms, up to `timeout`.
pub fn wait_until<F>(timeout: Duration, mut pred: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if pred() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}
