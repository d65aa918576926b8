//! Messages delivered to the session's owning thread.

use std::time::{Duration, Instant};

use config::{PlaybackMode, Role};
use crossbeam_channel::{Receiver, Sender, bounded};
use keytoken::{MouseButton, Token};

use crate::Outcome;

/// Capacity of the session inbox. Capture drops events rather than block
/// when it is full.
pub const SESSION_CHANNEL_CAPACITY: usize = 1024;

/// Create the session inbox.
pub fn session_channel() -> (Sender<SessionEvent>, Receiver<SessionEvent>) {
    bounded(SESSION_CHANNEL_CAPACITY)
}

/// What kind of input a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A key-down.
    Key,
    /// A mouse-button press, with the pointer position at press time.
    Click {
        /// Button pressed.
        button: MouseButton,
        /// Pointer x.
        x: i32,
        /// Pointer y.
        y: i32,
    },
}

/// One normalized input event from the capture thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedInput {
    /// Canonical token.
    pub token: Token,
    /// Source of the token.
    pub kind: InputKind,
    /// Capture time.
    pub at: Instant,
}

/// Requests from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a run; `None` uses the configured mode.
    Start(Option<PlaybackMode>),
    /// Stop the active run.
    Stop,
    /// Stop if running, else start the configured mode.
    Toggle,
    /// Change the configured mode.
    SetMode(PlaybackMode),
    /// Bind the next input to a role.
    BeginAssignment(Role),
    /// Leave assignment without binding.
    CancelAssignment,
    /// Start recording a macro, discarding the previous one.
    StartRecording,
    /// Finish recording.
    StopRecording,
    /// Discard every recorded step.
    ClearMacro,
    /// Store the pointer position as the fixed click target.
    CapturePosition,
    /// Validate and persist the settings.
    Save,
    /// Report a status snapshot.
    Status,
    /// Report the recorded steps.
    ListSteps,
    /// Stop everything and leave the session loop.
    Quit,
}

/// Reports from a playback unit, tagged with its run id.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Countdown in progress.
    Countdown(Duration),
    /// The run body started.
    Started,
    /// Actions performed so far.
    Progress {
        /// Clicks (autoclick) or executed steps (macro).
        count: u64,
        /// Completed macro loops.
        loops: u32,
    },
    /// The unit exited. Sent exactly once per run.
    Finished(Outcome),
}

/// Everything the session consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A captured input.
    Input(CapturedInput),
    /// A presentation request.
    Command(Command),
    /// A playback report.
    Run {
        /// Run the report belongs to.
        run_id: u64,
        /// The report.
        event: RunEvent,
    },
    /// Global capture could not be started or stopped unexpectedly.
    CaptureFailed(String),
}
