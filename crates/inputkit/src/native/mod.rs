//! OS backend: `rdev` global capture and `enigo` injection.
//!
//! Injection runs on one dedicated thread that owns the `enigo` handle;
//! callers on any thread send it requests and block for the reply. Capture
//! runs inside `rdev::listen` on the engine's capture thread.

mod capture;
mod inject;

use std::sync::Arc;

use clickloop_engine::{BackendError, EventSink, InputBackend};
use config::ClickKind;
use keytoken::{MouseButton, Token};
use parking_lot::Mutex;

use self::inject::{Injector, Op};
use crate::EchoFilter;

/// Global capture and injection against the real desktop.
pub struct NativeBackend {
    /// Handle to the injector thread.
    injector: Injector,
    /// Tokens we injected recently, shared with capture.
    echo: Arc<Mutex<EchoFilter>>,
}

impl NativeBackend {
    /// Start the injector thread. Fails when no input connection can be
    /// opened (no display, missing permissions).
    pub fn new() -> Result<Self, BackendError> {
        let echo = Arc::new(Mutex::new(EchoFilter::default()));
        let injector = Injector::spawn(echo.clone())?;
        Ok(Self { injector, echo })
    }
}

impl InputBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn listen(&self, sink: EventSink) -> Result<(), BackendError> {
        capture::listen(sink, self.injector.clone(), self.echo.clone())
    }

    fn pointer(&self) -> Result<(i32, i32), BackendError> {
        self.injector.call(Op::Pointer)
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), BackendError> {
        self.injector.call(Op::Move { x, y }).map(drop)
    }

    fn click(
        &self,
        button: MouseButton,
        kind: ClickKind,
        at: Option<(i32, i32)>,
    ) -> Result<(), BackendError> {
        self.injector
            .call(Op::Click { button, kind, at })
            .map(drop)
    }

    fn tap(&self, token: &Token) -> Result<(), BackendError> {
        self.injector.call(Op::Tap(token.clone())).map(drop)
    }
}
