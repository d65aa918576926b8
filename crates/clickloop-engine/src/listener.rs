//! Global capture and input routing.
//!
//! Capture and routing are split across threads. The capture side
//! ([`EventSink`], driven by [`GlobalListener`]) only normalizes raw events
//! and forwards tokens into the session inbox. The routing side
//! ([`Router`]) lives inside the session on the owning thread and decides
//! what each token means: a hotkey assignment, a recorded macro step, or a
//! hotkey trigger.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use config::{HotkeyBindings, MacroStep, Role};
use crossbeam_channel::{Sender, TrySendError};
use keytoken::{RawKey, Token, normalize_key, normalize_mouse};
use tracing::{debug, trace, warn};

use crate::{CapturedInput, InputBackend, InputKind, Result, SessionEvent};

/// Log every Nth dropped capture event after the first.
const DROP_LOG_EVERY: u64 = 1000;

/// Capture-side handle into the session inbox.
///
/// Backends call [`EventSink::key`] and [`EventSink::mouse`] from their
/// capture callback. Unsupported events are dropped here; only tokens cross
/// into the session.
#[derive(Clone)]
pub struct EventSink {
    /// Session inbox.
    tx: Sender<SessionEvent>,
    /// Events dropped because the inbox was full.
    dropped: Arc<AtomicU64>,
}

impl EventSink {
    /// Wrap the session inbox.
    pub fn new(tx: Sender<SessionEvent>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Report a key-down. Returns `true` when a token was forwarded.
    pub fn key(&self, raw: &RawKey) -> bool {
        match normalize_key(raw) {
            Some(token) => self.push(token, InputKind::Key, Instant::now()),
            None => {
                trace!(?raw, "capture_key_unmapped");
                false
            }
        }
    }

    /// Report a mouse-button transition at pointer position `(x, y)`.
    /// Releases never produce a token.
    pub fn mouse(&self, button: &str, pressed: bool, x: i32, y: i32) -> bool {
        let Some(token) = normalize_mouse(button, pressed) else {
            return false;
        };
        let Some(b) = token.mouse_button() else {
            return false;
        };
        self.push(token, InputKind::Click { button: b, x, y }, Instant::now())
    }

    /// Forward an already normalized input.
    pub fn push(&self, token: Token, kind: InputKind, at: Instant) -> bool {
        let ev = SessionEvent::Input(CapturedInput { token, kind, at });
        match self.tx.try_send(ev) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if n == 1 || n % DROP_LOG_EVERY == 0 {
                    warn!(dropped = n, "capture_event_dropped_inbox_full");
                }
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Report that capture failed.
    pub fn failed(&self, reason: String) {
        let _ignored = self.tx.send(SessionEvent::CaptureFailed(reason));
    }

    /// Total events dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// The long-lived capture thread.
pub struct GlobalListener {
    /// Capture thread handle.
    handle: JoinHandle<()>,
}

impl GlobalListener {
    /// Spawn the capture thread and start `backend` delivering into `sink`.
    pub fn spawn(backend: Arc<dyn InputBackend>, sink: EventSink) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("clickloop-capture".into())
            .spawn(move || {
                debug!(backend = backend.name(), "capture_started");
                match backend.listen(sink.clone()) {
                    Ok(()) => debug!(backend = backend.name(), "capture_listen_returned"),
                    Err(e) => {
                        warn!(backend = backend.name(), error = %e, "capture_failed");
                        sink.failed(e.to_string());
                    }
                }
            })?;
        Ok(Self { handle })
    }

    /// True while the capture thread is alive.
    ///
    /// Backends that register a callback and return from `listen` finish this
    /// thread immediately while capture continues elsewhere.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// What the listener currently does with input.
///
/// The three modes are mutually exclusive; only the session changes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerMode {
    /// Inputs trigger hotkeys.
    #[default]
    Idle,
    /// The next input binds to this role.
    AwaitingAssignment(Role),
    /// Inputs become macro steps.
    RecordingMacro {
        /// Capture time of the previous recorded input.
        last: Option<Instant>,
    },
}

impl ListenerMode {
    /// Short description for status lines.
    pub fn describe(&self) -> String {
        match self {
            Self::Idle => "listening for hotkeys".to_string(),
            Self::AwaitingAssignment(role) => format!("press a key to bind {role}"),
            Self::RecordingMacro { .. } => "recording macro".to_string(),
        }
    }
}

/// The meaning of one routed input.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// The token was bound to a role; assignment mode is over.
    Assigned {
        /// Role bound.
        role: Role,
        /// New binding.
        token: Token,
    },
    /// Steps to append to the macro, in order.
    Recorded(Vec<MacroStep>),
    /// A hotkey fired.
    Hotkey(Role),
    /// Nothing to do.
    Ignored,
}

/// Owner of [`ListenerMode`] and the routing decision.
#[derive(Debug, Default)]
pub struct Router {
    /// Current mode.
    mode: ListenerMode,
}

impl Router {
    /// A router in [`ListenerMode::Idle`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn mode(&self) -> ListenerMode {
        self.mode
    }

    /// True while recording.
    pub fn is_recording(&self) -> bool {
        matches!(self.mode, ListenerMode::RecordingMacro { .. })
    }

    /// Wait for the next input to bind `role`. Refused while recording.
    pub fn await_assignment(&mut self, role: Role) -> bool {
        if self.is_recording() {
            return false;
        }
        self.mode = ListenerMode::AwaitingAssignment(role);
        true
    }

    /// Leave assignment mode. Returns the role that was pending.
    pub fn cancel_assignment(&mut self) -> Option<Role> {
        match self.mode {
            ListenerMode::AwaitingAssignment(role) => {
                self.mode = ListenerMode::Idle;
                Some(role)
            }
            _ => None,
        }
    }

    /// Begin recording. Refused while awaiting an assignment.
    pub fn start_recording(&mut self) -> bool {
        if matches!(self.mode, ListenerMode::AwaitingAssignment(_)) {
            return false;
        }
        self.mode = ListenerMode::RecordingMacro { last: None };
        true
    }

    /// Stop recording. Returns whether recording was active.
    pub fn stop_recording(&mut self) -> bool {
        if self.is_recording() {
            self.mode = ListenerMode::Idle;
            true
        } else {
            false
        }
    }

    /// Forget the previous recorded timestamp, so the next input records no delay.
    pub fn reset_recording_clock(&mut self) {
        if let ListenerMode::RecordingMacro { last } = &mut self.mode {
            *last = None;
        }
    }

    /// Decide what `input` means.
    ///
    /// Assignment consumes the input first. Recording captures it next and
    /// never dispatches hotkeys. Otherwise the token is matched against the
    /// bindings, with emergency checked before toggle and toggle before
    /// capture.
    pub fn route(&mut self, input: &CapturedInput, bindings: &HotkeyBindings) -> Routed {
        match &mut self.mode {
            ListenerMode::AwaitingAssignment(role) => {
                let role = *role;
                self.mode = ListenerMode::Idle;
                Routed::Assigned {
                    role,
                    token: input.token.clone(),
                }
            }
            ListenerMode::RecordingMacro { last } => {
                let mut steps = Vec::with_capacity(2);
                if let Some(prev) = *last {
                    let elapsed = input.at.saturating_duration_since(prev);
                    steps.push(MacroStep::delay(elapsed.as_secs_f64()));
                }
                *last = Some(input.at);
                steps.push(match input.kind {
                    InputKind::Key => MacroStep::KeyPress {
                        token: input.token.clone(),
                    },
                    InputKind::Click { button, x, y } => MacroStep::Click { button, x, y },
                });
                Routed::Recorded(steps)
            }
            ListenerMode::Idle => match bindings.role_for(&input.token) {
                Some(role) => Routed::Hotkey(role),
                None => Routed::Ignored,
            },
        }
    }
}
