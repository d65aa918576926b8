use config::{MacroStep, PlaybackMode, Role};
use crossbeam_channel::Sender;
use keytoken::Token;
use tracing::info;

use crate::{Error, ListenerMode, Progress, Result, RunState};

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    /// Informational.
    Info,
    /// Something was refused or skipped.
    Warn,
    /// Something failed.
    Error,
    /// Something finished well.
    Success,
}

/// A point-in-time summary for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Run state.
    pub state: RunState,
    /// Configured mode.
    pub mode: PlaybackMode,
    /// Listener mode.
    pub listener: ListenerMode,
    /// Toggle binding.
    pub toggle: Token,
    /// Emergency binding.
    pub emergency: Token,
    /// Capture binding, if any.
    pub capture: Option<Token>,
    /// Recorded step count.
    pub steps: usize,
    /// Click target description.
    pub position: String,
}

/// Messages from the session to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Run state changed.
    State(RunState),
    /// Live counters for the active run, throttled.
    Progress(Progress),
    /// A one-shot message for the user.
    Notify {
        /// Severity.
        kind: NotifyKind,
        /// Short title.
        title: String,
        /// Body.
        text: String,
    },
    /// A step was appended to the macro.
    StepAppended(MacroStep),
    /// The macro was cleared.
    MacroCleared,
    /// A role was bound to a new token.
    BindingChanged {
        /// Role.
        role: Role,
        /// New token.
        token: Token,
    },
    /// The listener changed mode.
    Listener(ListenerMode),
    /// The configured mode changed.
    ModeChanged(PlaybackMode),
    /// Reply to a status request.
    Status(StatusSnapshot),
    /// Reply to a step listing request.
    Steps(Vec<MacroStep>),
}

/// Sends state changes and notifications to the UI layer.
#[derive(Clone)]
pub struct Notifier {
    /// UI channel.
    tx: Sender<UiEvent>,
}

impl Notifier {
    /// Create a new notifier from a UI message channel.
    pub fn new(tx: Sender<UiEvent>) -> Self {
        Self { tx }
    }

    /// Send one UI event.
    pub fn send(&self, ev: UiEvent) -> Result<()> {
        self.tx.try_send(ev).map_err(|_| Error::ChannelClosed)
    }

    /// Send a notification with the given kind, title, and text.
    pub fn notify(&self, kind: NotifyKind, title: &str, text: String) -> Result<()> {
        info!(kind = ?kind, title = %title, text = %text, "notification_display");
        self.send(UiEvent::Notify {
            kind,
            title: title.to_string(),
            text,
        })
    }

    /// Informational notification.
    pub fn info(&self, title: &str, text: String) -> Result<()> {
        self.notify(NotifyKind::Info, title, text)
    }

    /// Warning notification.
    pub fn warn(&self, title: &str, text: String) -> Result<()> {
        self.notify(NotifyKind::Warn, title, text)
    }

    /// Success notification.
    pub fn success(&self, title: &str, text: String) -> Result<()> {
        self.notify(NotifyKind::Success, title, text)
    }

    /// Error notification.
    pub fn error(&self, title: &str, text: String) -> Result<()> {
        self.notify(NotifyKind::Error, title, text)
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;

    #[test]
    fn closed_channel_is_reported() {
        let (tx, rx) = unbounded();
        let n = Notifier::new(tx);
        n.info("Hotkey", "set".into()).unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            UiEvent::Notify {
                kind: NotifyKind::Info,
                ..
            }
        ));
        drop(rx);
        assert!(matches!(
            n.send(UiEvent::MacroCleared),
            Err(Error::ChannelClosed)
        ));
    }
}
