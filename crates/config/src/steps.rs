//! Recorded macro steps.

use std::fmt;

use keytoken::{MouseButton, Token};
use serde::{Deserialize, Serialize};

/// One unit of macro playback.
///
/// On disk each step is `{"kind": "delay"|"key"|"click", "value": {...}}`.
/// A macro is an ordered `Vec<MacroStep>`; order is the replay order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum MacroStep {
    /// Wait before the next step.
    #[serde(rename = "delay")]
    Delay {
        /// Non-negative wait in seconds.
        seconds: f64,
    },
    /// Tap a key.
    #[serde(rename = "key")]
    KeyPress {
        /// Key to tap.
        token: Token,
    },
    /// Single-click a button at absolute screen coordinates.
    #[serde(rename = "click")]
    Click {
        /// Button to click.
        button: MouseButton,
        /// Absolute x coordinate.
        x: i32,
        /// Absolute y coordinate.
        y: i32,
    },
}

impl MacroStep {
    /// A delay step; negative and non-finite durations collapse to zero.
    pub fn delay(seconds: f64) -> Self {
        Self::Delay {
            seconds: clamp_seconds(seconds),
        }
    }

    /// Clamp any out-of-range payload in place.
    pub(crate) fn clamp(&mut self) {
        if let Self::Delay { seconds } = self {
            *seconds = clamp_seconds(*seconds);
        }
    }
}

fn clamp_seconds(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    }
}

impl fmt::Display for MacroStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delay { seconds } => write!(f, "delay {seconds:.3}s"),
            Self::KeyPress { token } => write!(f, "key {}", token.label()),
            Self::Click { button, x, y } => write!(f, "click {button} @({x},{y})"),
        }
    }
}
