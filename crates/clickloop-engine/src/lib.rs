//! clickloop engine
//!
//! The engine turns a global input stream into hotkey actions, recorded
//! macros and playback runs:
//! - the capture side normalizes raw events into tokens and forwards them
//! - the [`Session`] routes each token (assignment, recording or hotkey) and
//!   owns the single run state
//! - playback units run autoclick or macro loops on their own thread,
//!   cancellable within one sleep slice
//!
//! All OS access goes through [`InputBackend`]; see the `inputkit` crate for
//! concrete backends and [`test_support`] for an in-memory one.

mod backend;
pub mod delay;
mod error;
mod events;
mod listener;
mod notification;
pub mod pacing;
pub mod playback;
mod session;
mod state;
pub mod test_support;

pub use backend::{BackendError, InputBackend};
pub use error::{Error, Result};
pub use events::{
    CapturedInput, Command, InputKind, RunEvent, SESSION_CHANNEL_CAPACITY, SessionEvent,
    session_channel,
};
pub use listener::{EventSink, GlobalListener, ListenerMode, Routed, Router};
pub use notification::{Notifier, NotifyKind, StatusSnapshot, UiEvent};
pub use playback::{Outcome, RunHandle};
pub use session::{PROGRESS_UI_INTERVAL, SHUTDOWN_WAIT, Session};
pub use state::{Progress, RunState, StopReason};
