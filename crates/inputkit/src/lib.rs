//! Input backends for clickloop.
//!
//! - [`DryRunBackend`] is always available. It logs every action against a
//!   virtual pointer and has no capture side.
//! - `NativeBackend` (cargo feature `native`) captures global input with
//!   `rdev` and injects clicks and key taps with `enigo`.
//!
//! Both implement [`clickloop_engine::InputBackend`].
#![warn(missing_docs)]

use std::sync::Arc;

use clickloop_engine::{BackendError, InputBackend};

mod dry_run;
mod echo;
#[cfg(feature = "native")]
mod native;

pub use dry_run::DryRunBackend;
pub use echo::{ECHO_WINDOW, EchoFilter};
#[cfg(feature = "native")]
pub use native::NativeBackend;

/// True when `(x, y)` lies in the fail-safe corner.
///
/// Injected actions refuse to run while the pointer sits in the top-left
/// corner; the operator can always stop a runaway run by slamming the mouse
/// there.
pub fn in_safety_corner(x: i32, y: i32) -> bool {
    x <= 0 && y <= 0
}

/// Whether this build can open the native backend.
pub fn native_available() -> bool {
    cfg!(feature = "native")
}

/// Open the backend for this process: the dry-run backend when `dry_run` is
/// set, otherwise the native one.
pub fn open(dry_run: bool) -> Result<Arc<dyn InputBackend>, BackendError> {
    if dry_run {
        return Ok(Arc::new(DryRunBackend::new()));
    }
    open_native()
}

#[cfg(feature = "native")]
fn open_native() -> Result<Arc<dyn InputBackend>, BackendError> {
    Ok(Arc::new(NativeBackend::new()?))
}

#[cfg(not(feature = "native"))]
fn open_native() -> Result<Arc<dyn InputBackend>, BackendError> {
    Err(BackendError::Unsupported(
        "built without the `native` feature; use --dry-run".to_string(),
    ))
}
