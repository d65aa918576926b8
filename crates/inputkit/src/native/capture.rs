//! Global capture through `rdev`.

use std::{sync::Arc, time::Instant};

use clickloop_engine::{BackendError, EventSink, InputKind};
use keytoken::{RawKey, named_key, normalize_key, normalize_mouse};
use parking_lot::Mutex;
use rdev::{Button, Event, EventType, Key};
use tracing::{debug, trace};

use super::inject::{Injector, Op};
use crate::EchoFilter;

/// Capture state shared by every callback invocation.
struct Capture {
    /// Where normalized input goes.
    sink: EventSink,
    /// Used to read the pointer before the first mouse move is seen.
    injector: Injector,
    /// Our own injected input.
    echo: Arc<Mutex<EchoFilter>>,
    /// Last pointer position reported by capture.
    pointer: Option<(i32, i32)>,
}

/// Block in `rdev::listen`, forwarding key-downs and button presses.
pub(super) fn listen(
    sink: EventSink,
    injector: Injector,
    echo: Arc<Mutex<EchoFilter>>,
) -> Result<(), BackendError> {
    let mut cap = Capture {
        sink,
        injector,
        echo,
        pointer: None,
    };
    debug!("rdev_listen");
    rdev::listen(move |event| cap.on_event(event))
        .map_err(|e| BackendError::Failed(format!("global capture unavailable: {e:?}")))
}

impl Capture {
    /// Handle one raw event.
    fn on_event(&mut self, event: Event) {
        match event.event_type {
            EventType::MouseMove { x, y } => {
                self.pointer = Some((x.round() as i32, y.round() as i32));
            }
            EventType::KeyPress(key) => {
                let raw = raw_key(key, event.name.as_deref());
                let Some(token) = normalize_key(&raw) else {
                    trace!(?key, "capture_key_unmapped");
                    return;
                };
                if self.echo.lock().is_echo(&token, Instant::now()) {
                    trace!(%token, "capture_echo_suppressed");
                    return;
                }
                self.sink.push(token, InputKind::Key, Instant::now());
            }
            EventType::ButtonPress(b) => {
                let Some(token) = normalize_mouse(&button_name(b), true) else {
                    trace!(?b, "capture_button_unmapped");
                    return;
                };
                let Some(button) = token.mouse_button() else {
                    return;
                };
                if self.echo.lock().is_echo(&token, Instant::now()) {
                    trace!(%token, "capture_echo_suppressed");
                    return;
                }
                let (x, y) = self.position();
                self.sink
                    .push(token, InputKind::Click { button, x, y }, Instant::now());
            }
            _ => {}
        }
    }

    /// Pointer position for a button press.
    fn position(&mut self) -> (i32, i32) {
        if let Some(p) = self.pointer {
            return p;
        }
        let p = self.injector.call(Op::Pointer).unwrap_or_default();
        self.pointer = Some(p);
        p
    }
}

/// Reduce an `rdev` key to a raw key.
///
/// Named keys win over the produced character so that `Return` maps to
/// `enter` regardless of layout. Printable characters come from the event
/// name; without one, letter and digit keys fall back to their key code.
fn raw_key(key: Key, name: Option<&str>) -> RawKey {
    let code = format!("{key:?}");
    if named_key(&code).is_some() {
        return RawKey::Named(code);
    }
    if let Some(c) = name.and_then(printable) {
        return RawKey::Char(c);
    }
    let stripped = ["Key", "Num", "Kp"]
        .iter()
        .find_map(|p| code.strip_prefix(p))
        .and_then(printable);
    match stripped {
        Some(c) => RawKey::Char(c.to_ascii_lowercase()),
        None => RawKey::Named(code),
    }
}

/// The single printable character in `s`, if that is all it holds.
fn printable(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => Some(c),
        _ => None,
    }
}

/// Button name understood by the normalizer.
fn button_name(b: Button) -> String {
    match b {
        Button::Left => "left".to_string(),
        Button::Right => "right".to_string(),
        Button::Middle => "middle".to_string(),
        Button::Unknown(n) => format!("button{n}"),
    }
}
