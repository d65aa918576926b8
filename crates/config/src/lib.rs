//! Persisted settings for clickloop: hotkey bindings, autoclick options,
//! the recorded macro, and the immutable [`RunConfig`] snapshot a run is
//! started from.
//!
//! The on-disk form is a flat JSON object. Loading is lenient (missing
//! fields default, numbers clamp, bad macro steps are skipped); saving
//! validates first.

use std::{
    env,
    path::{Path, PathBuf},
};

mod defaults;
mod error;
mod loader;
mod raw;
mod run;
mod settings;
mod steps;

pub use error::{Error, excerpt_at};
pub use keytoken::{MouseButton, Token};
pub use loader::{
    load_from_path, load_from_str, load_or_default, save_to_path, to_json, write_to_path,
};
pub use run::{ClickTarget, MacroDelays, RunConfig, RunLimit};
pub use settings::{ClickKind, HotkeyBindings, PlaybackMode, Role, RunLimitKind, Settings};
pub use steps::MacroStep;

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The default settings path (`~/.clickloop/settings.json`).
pub fn default_settings_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".clickloop");
    p.push("settings.json");
    p
}

/// Resolve the effective settings path: `explicit` when given, else the default.
///
/// The file need not exist; a missing file loads as defaults.
pub fn resolve_settings_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(default_settings_path, Path::to_path_buf)
}
