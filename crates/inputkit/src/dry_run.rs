//! A backend that performs nothing.
//!
//! Every action is logged at info and applied to a virtual pointer, which
//! makes the dry-run backend useful for checking a macro or an autoclick
//! configuration before pointing it at a real desktop.

use std::sync::atomic::{AtomicU64, Ordering};

use clickloop_engine::{BackendError, EventSink, InputBackend};
use config::ClickKind;
use keytoken::{MouseButton, Token};
use parking_lot::Mutex;
use tracing::info;

/// Logs actions against a virtual pointer; has no capture.
#[derive(Debug, Default)]
pub struct DryRunBackend {
    /// Virtual pointer position.
    pointer: Mutex<(i32, i32)>,
    /// Actions performed so far.
    actions: AtomicU64,
}

impl DryRunBackend {
    /// A backend with the virtual pointer at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend with the virtual pointer at `(x, y)`.
    pub fn with_pointer(x: i32, y: i32) -> Self {
        Self {
            pointer: Mutex::new((x, y)),
            actions: AtomicU64::new(0),
        }
    }

    /// Number of actions performed so far.
    pub fn actions(&self) -> u64 {
        self.actions.load(Ordering::Relaxed)
    }

    /// Bump the action counter and return the new value.
    fn count(&self) -> u64 {
        self.actions.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl InputBackend for DryRunBackend {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn listen(&self, _sink: EventSink) -> Result<(), BackendError> {
        Err(BackendError::Unsupported(
            "the dry-run backend cannot capture input".to_string(),
        ))
    }

    fn pointer(&self) -> Result<(i32, i32), BackendError> {
        Ok(*self.pointer.lock())
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), BackendError> {
        *self.pointer.lock() = (x, y);
        let n = self.count();
        info!(n, x, y, "dry_run_move");
        Ok(())
    }

    fn click(
        &self,
        button: MouseButton,
        kind: ClickKind,
        at: Option<(i32, i32)>,
    ) -> Result<(), BackendError> {
        let (x, y) = {
            let mut p = self.pointer.lock();
            if let Some(target) = at {
                *p = target;
            }
            *p
        };
        let n = self.count();
        info!(n, %button, ?kind, x, y, "dry_run_click");
        Ok(())
    }

    fn tap(&self, token: &Token) -> Result<(), BackendError> {
        let n = self.count();
        info!(n, %token, "dry_run_tap");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clickloop_engine::session_channel;

    use super::*;

    #[test]
    fn click_at_moves_virtual_pointer() {
        let b = DryRunBackend::new();
        b.click(MouseButton::Left, ClickKind::Single, Some((40, 50)))
            .unwrap();
        assert_eq!(b.pointer().unwrap(), (40, 50));
        b.click(MouseButton::Right, ClickKind::Double, None).unwrap();
        assert_eq!(b.pointer().unwrap(), (40, 50));
        assert_eq!(b.actions(), 2);
    }

    #[test]
    fn move_and_tap_are_counted() {
        let b = DryRunBackend::with_pointer(5, 5);
        b.move_to(9, 8).unwrap();
        b.tap(&Token::parse("f8").unwrap()).unwrap();
        assert_eq!(b.pointer().unwrap(), (9, 8));
        assert_eq!(b.actions(), 2);
    }

    #[test]
    fn capture_is_unsupported() {
        let (tx, _rx) = session_channel();
        let b = DryRunBackend::new();
        assert!(matches!(
            b.listen(EventSink::new(tx)),
            Err(BackendError::Unsupported(_))
        ));
    }
}
