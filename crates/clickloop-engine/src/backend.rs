//! The input backend seam.
//!
//! Everything that touches the operating system's input stream goes through
//! [`InputBackend`]: global capture, pointer queries and injected clicks and
//! key taps. The engine never sees a backend-specific event type; capture
//! reports raw keys and button names to an [`EventSink`], which normalizes
//! them to tokens before they leave the capture thread.

use config::ClickKind;
use keytoken::{MouseButton, Token};
use thiserror::Error;

use crate::EventSink;

/// Failures reported by an input backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The operator tripped the backend's fail-safe. A run that sees this
    /// stops normally and reports the abort; it is not a failure.
    #[error("safety abort")]
    SafetyAbort,

    /// The backend cannot perform this operation at all.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The operation was attempted and failed.
    #[error("{0}")]
    Failed(String),
}

/// Capture and injection primitives.
///
/// Implementations must be usable from several threads at once: capture runs
/// on the listener thread, injection on a playback thread, and pointer
/// queries on the session thread.
pub trait InputBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Start delivering global key-down and mouse-button events to `sink`.
    ///
    /// May block for the lifetime of the capture, or register the sink and
    /// return; it is always called on a dedicated thread.
    fn listen(&self, sink: EventSink) -> Result<(), BackendError>;

    /// Current pointer position in absolute screen coordinates.
    fn pointer(&self) -> Result<(i32, i32), BackendError>;

    /// Move the pointer to absolute screen coordinates.
    fn move_to(&self, x: i32, y: i32) -> Result<(), BackendError>;

    /// Click `button` once or twice, at `at` when given and otherwise wherever
    /// the pointer is.
    fn click(
        &self,
        button: MouseButton,
        kind: ClickKind,
        at: Option<(i32, i32)>,
    ) -> Result<(), BackendError>;

    /// Press and release the key named by `token`.
    fn tap(&self, token: &Token) -> Result<(), BackendError>;
}
