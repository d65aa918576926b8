//! The injector thread.

use std::{sync::Arc, thread, time::Instant};

use clickloop_engine::BackendError;
use config::ClickKind;
use crossbeam_channel::{Sender, bounded, unbounded};
use enigo::{Button, Coordinate, Direction, Enigo, InputError, Key, Keyboard, Mouse, Settings};
use keytoken::{MouseButton, Token};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{EchoFilter, in_safety_corner};

/// One injection request.
#[derive(Debug)]
pub(super) enum Op {
    /// Report the pointer position.
    Pointer,
    /// Move the pointer.
    Move {
        /// Target x.
        x: i32,
        /// Target y.
        y: i32,
    },
    /// Click a button, optionally after moving.
    Click {
        /// Button to click.
        button: MouseButton,
        /// Single or double.
        kind: ClickKind,
        /// Move here first.
        at: Option<(i32, i32)>,
    },
    /// Tap a key.
    Tap(Token),
}

/// Reply carrying the pointer position after the request.
type Reply = Result<(i32, i32), BackendError>;

/// A request plus the channel its reply goes to.
struct Request {
    /// What to do.
    op: Op,
    /// Where to send the outcome.
    reply: Sender<Reply>,
}

/// Cloneable handle to the injector thread.
#[derive(Clone)]
pub(super) struct Injector {
    /// Request queue.
    tx: Sender<Request>,
}

impl Injector {
    /// Spawn the thread and wait until it has opened its `enigo` handle.
    pub(super) fn spawn(echo: Arc<Mutex<EchoFilter>>) -> Result<Self, BackendError> {
        let (tx, rx) = unbounded::<Request>();
        let (ready_tx, ready_rx) = bounded::<Result<(), BackendError>>(1);
        thread::Builder::new()
            .name("clickloop-inject".into())
            .spawn(move || {
                let mut enigo = match Enigo::new(&Settings::default()) {
                    Ok(e) => e,
                    Err(e) => {
                        ready_tx
                            .send(Err(BackendError::Failed(format!(
                                "cannot open input connection: {e}"
                            ))))
                            .ok();
                        return;
                    }
                };
                ready_tx.send(Ok(())).ok();
                debug!("injector_started");
                for req in rx.iter() {
                    let res = perform(&mut enigo, &echo, req.op);
                    req.reply.send(res).ok();
                }
                debug!("injector_stopped");
            })
            .map_err(|e| BackendError::Failed(format!("cannot spawn injector: {e}")))?;
        ready_rx.recv().map_err(|_| gone())??;
        Ok(Self { tx })
    }

    /// Run `op` on the injector thread and wait for the outcome.
    pub(super) fn call(&self, op: Op) -> Reply {
        let (reply, rx) = bounded(1);
        self.tx.send(Request { op, reply }).map_err(|_| gone())?;
        rx.recv().map_err(|_| gone())?
    }
}

/// The injector thread has exited.
fn gone() -> BackendError {
    BackendError::Failed("injector thread exited".to_string())
}

/// Map an enigo error.
fn failed(e: InputError) -> BackendError {
    BackendError::Failed(e.to_string())
}

/// Execute one request on the injector thread.
fn perform(enigo: &mut Enigo, echo: &Mutex<EchoFilter>, op: Op) -> Reply {
    let (x, y) = enigo.location().map_err(failed)?;
    if matches!(op, Op::Pointer) {
        return Ok((x, y));
    }
    if in_safety_corner(x, y) {
        warn!(x, y, "safety_abort_corner");
        return Err(BackendError::SafetyAbort);
    }
    trace!(?op, "inject");
    match op {
        Op::Pointer => {}
        Op::Move { x, y } => enigo.move_mouse(x, y, Coordinate::Abs).map_err(failed)?,
        Op::Click { button, kind, at } => {
            if let Some((x, y)) = at {
                enigo.move_mouse(x, y, Coordinate::Abs).map_err(failed)?;
            }
            let times = match kind {
                ClickKind::Single => 1,
                ClickKind::Double => 2,
            };
            for _ in 0..times {
                click(enigo, echo, button)?;
            }
        }
        Op::Tap(token) => match token.mouse_button() {
            Some(button) => click(enigo, echo, button)?,
            None => {
                let key = enigo_key(&token)?;
                echo.lock().injected(token, Instant::now());
                enigo.key(key, Direction::Click).map_err(failed)?;
            }
        },
    }
    enigo.location().map_err(failed)
}

/// One press-and-release of `button`.
fn click(enigo: &mut Enigo, echo: &Mutex<EchoFilter>, button: MouseButton) -> Result<(), BackendError> {
    echo.lock().injected(Token::mouse(button), Instant::now());
    enigo
        .button(enigo_button(button), Direction::Click)
        .map_err(failed)
}

/// The enigo button for a mouse button.
fn enigo_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
        MouseButton::Middle => Button::Middle,
        MouseButton::X1 => Button::Back,
        MouseButton::X2 => Button::Forward,
    }
}

/// The enigo key for a keyboard token.
fn enigo_key(token: &Token) -> Result<Key, BackendError> {
    let s = token.as_str();
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(Key::Unicode(c));
    }
    let key = match s {
        "esc" => Key::Escape,
        "space" => Key::Space,
        "pgup" => Key::PageUp,
        "pgdn" => Key::PageDown,
        "home" => Key::Home,
        "end" => Key::End,
        #[cfg(not(target_os = "macos"))]
        "insert" => Key::Insert,
        "delete" => Key::Delete,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "tab" => Key::Tab,
        "enter" => Key::Return,
        "backspace" => Key::Backspace,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        "f13" => Key::F13,
        "f14" => Key::F14,
        "f15" => Key::F15,
        "f16" => Key::F16,
        "f17" => Key::F17,
        "f18" => Key::F18,
        "f19" => Key::F19,
        "f20" => Key::F20,
        other => {
            return Err(BackendError::Unsupported(format!(
                "cannot inject key {other:?} on this platform"
            )));
        }
    };
    Ok(key)
}
