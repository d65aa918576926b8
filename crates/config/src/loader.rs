//! Read and write the settings file.

use std::{fs, io, path::Path};

use tracing::{debug, warn};

use crate::{Error, Settings, error::excerpt_at};

/// Parse settings from JSON text.
///
/// `path` is attached to any error for display only.
pub fn load_from_str(source: &str, path: Option<&Path>) -> Result<Settings, Error> {
    serde_json::from_str::<Settings>(source).map_err(|e| {
        let line = e.line().max(1);
        let col = e.column().max(1);
        Error::Parse {
            path: path.map(Path::to_path_buf),
            line,
            col,
            message: e.to_string(),
            excerpt: excerpt_at(source, line, col),
        }
    })
}

/// Load settings from `path`. A missing file yields the defaults.
pub fn load_from_path(path: &Path) -> Result<Settings, Error> {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "settings_missing_using_defaults");
            return Ok(Settings::default());
        }
        Err(e) => {
            return Err(Error::Read {
                path: Some(path.to_path_buf()),
                message: e.to_string(),
            });
        }
    };
    let settings = load_from_str(&source, Some(path))?;
    debug!(
        path = %path.display(),
        steps = settings.macro_steps.len(),
        mode = %settings.mode,
        "settings_loaded"
    );
    Ok(settings)
}

/// Load settings, falling back to the defaults on any error.
///
/// A broken file is logged and replaced wholesale; no field of it survives.
pub fn load_or_default(path: &Path) -> Settings {
    match load_from_path(path) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e.pretty(), "settings_load_failed_using_defaults");
            Settings::default()
        }
    }
}

/// Render settings as pretty JSON.
pub fn to_json(settings: &Settings) -> Result<String, Error> {
    serde_json::to_string_pretty(settings).map_err(|e| Error::Write {
        path: None,
        message: e.to_string(),
    })
}

/// Write settings to `path` without validating them, creating parent directories.
pub fn write_to_path(settings: &Settings, path: &Path) -> Result<(), Error> {
    let body = to_json(settings)?;
    let write_err = |e: io::Error| Error::Write {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, body).map_err(write_err)?;
    debug!(path = %path.display(), "settings_written");
    Ok(())
}

/// Validate and then write settings to `path`.
///
/// A validation failure leaves the file untouched.
pub fn save_to_path(settings: &Settings, path: &Path) -> Result<(), Error> {
    settings.validate()?;
    write_to_path(settings, path)
}
