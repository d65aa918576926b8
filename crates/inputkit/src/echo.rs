//! Suppression of our own injected input.
//!
//! Global capture sees every event the injector produces. Each injected
//! token is noted here just before it is sent; the capture side consumes a
//! matching note instead of forwarding the event, so replayed keys never
//! trigger hotkeys or land in a recording.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use keytoken::Token;

/// How long an injected token stays eligible for suppression.
pub const ECHO_WINDOW: Duration = Duration::from_millis(150);

/// Pending injected tokens, oldest first.
#[derive(Debug)]
pub struct EchoFilter {
    /// Tokens injected within the window.
    pending: VecDeque<(Token, Instant)>,
    /// Suppression window.
    window: Duration,
}

impl Default for EchoFilter {
    fn default() -> Self {
        Self::new(ECHO_WINDOW)
    }
}

impl EchoFilter {
    /// A filter that forgets injected tokens after `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            window,
        }
    }

    /// Note that `token` was injected at `at`.
    pub fn injected(&mut self, token: Token, at: Instant) {
        self.expire(at);
        self.pending.push_back((token, at));
    }

    /// Consume a pending note for `token`. Returns `true` when the captured
    /// event is our own echo and must be dropped.
    pub fn is_echo(&mut self, token: &Token, at: Instant) -> bool {
        self.expire(at);
        match self.pending.iter().position(|(t, _)| t == token) {
            Some(i) => {
                self.pending.remove(i);
                true
            }
            None => false,
        }
    }

    /// Number of notes still pending.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop notes older than the window.
    fn expire(&mut self, now: Instant) {
        while let Some((_, at)) = self.pending.front()
            && now.saturating_duration_since(*at) > self.window
        {
            self.pending.pop_front();
        }
    }
}
