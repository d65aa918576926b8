//! Canonical input tokens.
//!
//! A [`Token`] is a case-normalized string naming one input source: a single
//! printable character (`"a"`, `"7"`, `"/"`), a named key (`"f8"`, `"esc"`,
//! `"pgup"`) or a mouse button (`"mouse.left"`, `"mouse.x1"`). Tokens are the
//! only currency exchanged between the capture side and everything that
//! consumes input; raw backend events are reduced to a token by the
//! normalizer in [`normalize`] and never travel further.
#![warn(missing_docs)]

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod button;
mod normalize;

pub use button::MouseButton;
pub use normalize::{NAMED_KEYS, RawKey, named_key, normalize_key, normalize_mouse};

/// Prefix carried by every mouse-button token.
pub const MOUSE_PREFIX: &str = "mouse.";

/// A canonical key or mouse-button token.
///
/// Construct tokens through [`Token::parse`], [`Token::mouse`] or the
/// normalizer functions; the inner string is always canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token(String);

impl Token {
    /// Parse a token from user or file input.
    ///
    /// Input is trimmed and lowercased. Accepts single printable characters,
    /// any named key or alias understood by [`named_key`], and
    /// `mouse.<button>` with any alias understood by [`MouseButton::from_name`].
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let lower = s.to_lowercase();
        if let Some(name) = lower.strip_prefix(MOUSE_PREFIX) {
            return MouseButton::from_name(name).map(Self::mouse);
        }
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return normalize_key(&RawKey::Char(c));
        }
        named_key(&lower).map(|n| Self(n.to_string()))
    }

    /// The token for a mouse button.
    pub fn mouse(button: MouseButton) -> Self {
        Self(format!("{MOUSE_PREFIX}{}", button.name()))
    }

    /// Borrow the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this token names a mouse button.
    pub fn is_mouse(&self) -> bool {
        self.0.starts_with(MOUSE_PREFIX)
    }

    /// The mouse button this token names, if any.
    pub fn mouse_button(&self) -> Option<MouseButton> {
        self.0
            .strip_prefix(MOUSE_PREFIX)
            .and_then(MouseButton::from_name)
    }

    /// Human-friendly label for status lines and notifications.
    ///
    /// `mouse.x1` renders as `mouse x1`, page keys as `PgUp`/`PgDn`, and
    /// everything else upper-cased (`F8`, `ESC`, `A`).
    pub fn label(&self) -> String {
        if let Some(button) = self.0.strip_prefix(MOUSE_PREFIX) {
            return format!("mouse {button}");
        }
        match self.0.as_str() {
            "pgup" => "PgUp".to_string(),
            "pgdn" => "PgDn".to_string(),
            other => other.to_uppercase(),
        }
    }

    /// Built from an already canonical string (normalizer internals only).
    pub(crate) fn from_canonical(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a string is not a recognizable token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized key or button: {0:?}")]
pub struct ParseTokenError(pub String);

impl FromStr for Token {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseTokenError(s.to_string()))
    }
}

impl TryFrom<String> for Token {
    type Error = ParseTokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Token> for String {
    fn from(t: Token) -> Self {
        t.0
    }
}
