//! Lenient on-disk form of [`Settings`].
//!
//! Every field is optional and loosely typed so a hand-edited or older file
//! still loads: missing values take defaults, numbers are clamped, and
//! unrecognized enum strings or malformed macro steps are dropped with a
//! warning.

use keytoken::{MouseButton, Token};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::{
    MacroStep, defaults,
    settings::{ClickKind, HotkeyBindings, PlaybackMode, RunLimitKind, Settings, default_token},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawSettings {
    start_countdown: Option<f64>,
    hotkey_toggle: Option<String>,
    hotkey_emergency: Option<String>,
    hotkey_capture: Option<String>,
    delay_seconds: Option<f64>,
    delay_variation_pct: Option<f64>,
    mouse_button: Option<String>,
    click_type: Option<String>,
    use_fixed_position: Option<bool>,
    fixed_x: Option<f64>,
    fixed_y: Option<f64>,
    run_mode: Option<String>,
    run_amount: Option<f64>,
    mode: Option<String>,
    macro_steps: Option<Vec<Value>>,
    macro_use_recorded_delays: Option<bool>,
    macro_forced_delay: Option<f64>,
    macro_loops: Option<f64>,
}

/// Parse a token field, falling back to `fallback` with a warning.
fn token_or(field: &str, raw: Option<String>, fallback: &str) -> Token {
    match raw {
        None => default_token(fallback),
        Some(s) => Token::parse(&s).unwrap_or_else(|| {
            warn!(field, value = %s, "settings_bad_token");
            default_token(fallback)
        }),
    }
}

fn enum_or<T: Copy>(
    field: &str,
    raw: Option<String>,
    parse: fn(&str) -> Option<T>,
    fallback: T,
) -> T {
    match raw {
        None => fallback,
        Some(s) => parse(&s).unwrap_or_else(|| {
            warn!(field, value = %s, "settings_bad_enum");
            fallback
        }),
    }
}

fn parse_click_kind(s: &str) -> Option<ClickKind> {
    match s.trim().to_ascii_lowercase().as_str() {
        "single" => Some(ClickKind::Single),
        "double" => Some(ClickKind::Double),
        _ => None,
    }
}

fn parse_run_limit(s: &str) -> Option<RunLimitKind> {
    match s.trim().to_ascii_lowercase().as_str() {
        "until_stop" => Some(RunLimitKind::UntilStop),
        "fixed_amount" => Some(RunLimitKind::FixedAmount),
        _ => None,
    }
}

fn parse_mode(s: &str) -> Option<PlaybackMode> {
    s.parse().ok()
}

fn parse_steps(values: Vec<Value>) -> Vec<MacroStep> {
    let mut skipped = 0usize;
    let steps: Vec<MacroStep> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, v)| match serde_json::from_value::<MacroStep>(v) {
            Ok(mut step) => {
                step.clamp();
                Some(step)
            }
            Err(e) => {
                skipped += 1;
                warn!(index, error = %e, "settings_macro_step_skipped");
                None
            }
        })
        .collect();
    if skipped > 0 {
        warn!(skipped, kept = steps.len(), "settings_macro_steps_partial");
    }
    steps
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        let capture = raw.hotkey_capture.and_then(|s| {
            let t = Token::parse(&s);
            if t.is_none() && !s.trim().is_empty() {
                warn!(field = "hotkey_capture", value = %s, "settings_bad_token");
            }
            t
        });
        Self {
            start_countdown: raw
                .start_countdown
                .map_or(defaults::START_COUNTDOWN, |v| {
                    defaults::seconds(v, defaults::START_COUNTDOWN)
                }),
            hotkeys: HotkeyBindings {
                toggle: token_or("hotkey_toggle", raw.hotkey_toggle, defaults::HOTKEY_TOGGLE),
                emergency: token_or(
                    "hotkey_emergency",
                    raw.hotkey_emergency,
                    defaults::HOTKEY_EMERGENCY,
                ),
                capture,
            },
            delay_seconds: raw
                .delay_seconds
                .map_or(defaults::DELAY_SECONDS, |v| {
                    defaults::seconds(v, defaults::DELAY_SECONDS)
                }),
            delay_variation_pct: raw
                .delay_variation_pct
                .map_or(defaults::DELAY_VARIATION_PCT, |v| {
                    defaults::percent(v, defaults::DELAY_VARIATION_PCT)
                }),
            mouse_button: enum_or(
                "mouse_button",
                raw.mouse_button,
                MouseButton::from_name,
                MouseButton::Left,
            ),
            click_type: enum_or("click_type", raw.click_type, parse_click_kind, ClickKind::Single),
            use_fixed_position: raw.use_fixed_position.unwrap_or(false),
            fixed_x: raw.fixed_x.and_then(defaults::coord),
            fixed_y: raw.fixed_y.and_then(defaults::coord),
            run_mode: enum_or(
                "run_mode",
                raw.run_mode,
                parse_run_limit,
                RunLimitKind::UntilStop,
            ),
            run_amount: raw.run_amount.map_or(defaults::RUN_AMOUNT, |v| {
                defaults::count(v, defaults::MIN_RUN_AMOUNT, defaults::RUN_AMOUNT)
            }),
            mode: enum_or("mode", raw.mode, parse_mode, PlaybackMode::Autoclick),
            macro_steps: raw.macro_steps.map(parse_steps).unwrap_or_default(),
            macro_use_recorded_delays: raw
                .macro_use_recorded_delays
                .unwrap_or(defaults::MACRO_USE_RECORDED_DELAYS),
            macro_forced_delay: raw
                .macro_forced_delay
                .map_or(defaults::MACRO_FORCED_DELAY, |v| {
                    defaults::seconds(v, defaults::MACRO_FORCED_DELAY)
                }),
            macro_loops: raw
                .macro_loops
                .map_or(defaults::MACRO_LOOPS, |v| {
                    defaults::count(v, 0, defaults::MACRO_LOOPS)
                }),
        }
    }
}
