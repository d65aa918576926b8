//! The persisted settings model.

use std::{fmt, str::FromStr};

use keytoken::{MouseButton, Token};
use serde::{Deserialize, Serialize};

use crate::{Error, MacroStep, defaults, raw::RawSettings};

/// A hotkey role. Each role holds exactly one binding at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Start or stop the current mode.
    Toggle,
    /// Stop whatever is running.
    Emergency,
    /// Capture the pointer position as the fixed click target.
    Capture,
}

impl Role {
    /// All roles in tie-break order: when two roles share a token, the
    /// earlier one wins.
    pub const PRIORITY: [Self; 3] = [Self::Emergency, Self::Toggle, Self::Capture];

    /// Lowercase role name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::Emergency => "emergency",
            Self::Capture => "capture",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "toggle" => Ok(Self::Toggle),
            "emergency" | "stop" => Ok(Self::Emergency),
            "capture" => Ok(Self::Capture),
            other => Err(Error::validation(
                "role",
                format!("unknown hotkey role {other:?} (expected toggle, emergency or capture)"),
            )),
        }
    }
}

/// Role to token bindings.
///
/// Toggle and emergency are always bound; capture is optional. Nothing
/// prevents two roles from sharing a token; [`HotkeyBindings::role_for`]
/// resolves such overlaps in [`Role::PRIORITY`] order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotkeyBindings {
    /// Start/stop binding.
    #[serde(rename = "hotkey_toggle")]
    pub toggle: Token,
    /// Emergency stop binding.
    #[serde(rename = "hotkey_emergency")]
    pub emergency: Token,
    /// Optional position-capture binding.
    #[serde(rename = "hotkey_capture")]
    pub capture: Option<Token>,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            toggle: default_token(defaults::HOTKEY_TOGGLE),
            emergency: default_token(defaults::HOTKEY_EMERGENCY),
            capture: None,
        }
    }
}

/// Parse a built-in default token.
pub(crate) fn default_token(s: &str) -> Token {
    // The defaults are canonical literals; "f8" always parses.
    Token::parse(s).unwrap_or_else(|| Token::mouse(MouseButton::X1))
}

impl HotkeyBindings {
    /// The token bound to `role`, if any.
    pub fn get(&self, role: Role) -> Option<&Token> {
        match role {
            Role::Toggle => Some(&self.toggle),
            Role::Emergency => Some(&self.emergency),
            Role::Capture => self.capture.as_ref(),
        }
    }

    /// Bind `token` to `role`, replacing the previous binding.
    pub fn set(&mut self, role: Role, token: Token) {
        match role {
            Role::Toggle => self.toggle = token,
            Role::Emergency => self.emergency = token,
            Role::Capture => self.capture = Some(token),
        }
    }

    /// The role a token triggers, honouring the tie-break order.
    pub fn role_for(&self, token: &Token) -> Option<Role> {
        Role::PRIORITY
            .into_iter()
            .find(|r| self.get(*r) == Some(token))
    }

    /// Roles that share a token with another role.
    pub fn duplicates(&self) -> Vec<(Role, Role)> {
        let mut out = Vec::new();
        for (i, a) in Role::PRIORITY.iter().enumerate() {
            for b in &Role::PRIORITY[i + 1..] {
                if let (Some(ta), Some(tb)) = (self.get(*a), self.get(*b))
                    && ta == tb
                {
                    out.push((*a, *b));
                }
            }
        }
        out
    }
}

/// Single or double click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickKind {
    /// One click per action.
    #[default]
    Single,
    /// Two clicks per action.
    Double,
}

/// Whether an autoclick run is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunLimitKind {
    /// Click until stopped.
    #[default]
    UntilStop,
    /// Click `run_amount` times.
    FixedAmount,
}

/// Which playback mode a start request launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Repeat one click action.
    #[default]
    Autoclick,
    /// Replay the recorded macro.
    Macro,
}

impl PlaybackMode {
    /// Lowercase mode name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Autoclick => "autoclick",
            Self::Macro => "macro",
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlaybackMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autoclick" | "auto" | "click" => Ok(Self::Autoclick),
            "macro" => Ok(Self::Macro),
            other => Err(Error::validation(
                "mode",
                format!("unknown mode {other:?} (expected autoclick or macro)"),
            )),
        }
    }
}

/// Everything persisted to the settings file.
///
/// Deserialization goes through a lenient raw form: missing or unknown
/// fields take their defaults and out-of-range numbers are clamped, never
/// rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSettings")]
pub struct Settings {
    /// Seconds to wait after a start request before acting.
    pub start_countdown: f64,
    /// Hotkey bindings.
    #[serde(flatten)]
    pub hotkeys: HotkeyBindings,
    /// Base autoclick delay in seconds.
    pub delay_seconds: f64,
    /// Random jitter applied to the autoclick delay, in percent of the base.
    pub delay_variation_pct: f64,
    /// Autoclick button.
    pub mouse_button: MouseButton,
    /// Autoclick click kind.
    pub click_type: ClickKind,
    /// Click at the fixed coordinates instead of the pointer.
    pub use_fixed_position: bool,
    /// Fixed x coordinate.
    pub fixed_x: Option<i32>,
    /// Fixed y coordinate.
    pub fixed_y: Option<i32>,
    /// Autoclick bound.
    pub run_mode: RunLimitKind,
    /// Click count for [`RunLimitKind::FixedAmount`].
    pub run_amount: u32,
    /// Mode launched by start and toggle.
    pub mode: PlaybackMode,
    /// The recorded macro.
    pub macro_steps: Vec<MacroStep>,
    /// Replay recorded delays rather than the forced delay.
    pub macro_use_recorded_delays: bool,
    /// Delay used for every delay step when recorded delays are off.
    pub macro_forced_delay: f64,
    /// Number of macro loops; zero loops forever.
    pub macro_loops: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_countdown: defaults::START_COUNTDOWN,
            hotkeys: HotkeyBindings::default(),
            delay_seconds: defaults::DELAY_SECONDS,
            delay_variation_pct: defaults::DELAY_VARIATION_PCT,
            mouse_button: MouseButton::Left,
            click_type: ClickKind::Single,
            use_fixed_position: false,
            fixed_x: None,
            fixed_y: None,
            run_mode: RunLimitKind::UntilStop,
            run_amount: defaults::RUN_AMOUNT,
            mode: PlaybackMode::Autoclick,
            macro_steps: Vec::new(),
            macro_use_recorded_delays: defaults::MACRO_USE_RECORDED_DELAYS,
            macro_forced_delay: defaults::MACRO_FORCED_DELAY,
            macro_loops: defaults::MACRO_LOOPS,
        }
    }
}

impl Settings {
    /// Clamp every numeric field into its documented range.
    ///
    /// Called after programmatic edits; loading already clamps.
    pub fn clamp(&mut self) {
        self.start_countdown = defaults::seconds(self.start_countdown, defaults::START_COUNTDOWN);
        self.delay_seconds = defaults::seconds(self.delay_seconds, defaults::DELAY_SECONDS);
        self.delay_variation_pct =
            defaults::percent(self.delay_variation_pct, defaults::DELAY_VARIATION_PCT);
        self.run_amount = self.run_amount.max(defaults::MIN_RUN_AMOUNT);
        self.macro_forced_delay =
            defaults::seconds(self.macro_forced_delay, defaults::MACRO_FORCED_DELAY);
        for step in &mut self.macro_steps {
            step.clamp();
        }
    }

    /// Fixed coordinates when both are present.
    pub fn fixed_position(&self) -> Option<(i32, i32)> {
        self.fixed_x.zip(self.fixed_y)
    }

    /// Store a captured pointer position and switch to fixed targeting.
    pub fn capture_position(&mut self, x: i32, y: i32) {
        self.fixed_x = Some(x);
        self.fixed_y = Some(y);
        self.use_fixed_position = true;
    }

    /// Human-readable description of the click target.
    pub fn position_text(&self) -> String {
        if !self.use_fixed_position {
            return "Position: current mouse cursor".to_string();
        }
        match self.fixed_position() {
            Some((x, y)) => format!("Fixed position: ({x}, {y})"),
            None => "Fixed position: (not set)".to_string(),
        }
    }
}
