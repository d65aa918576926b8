use std::{io, result::Result as StdResult};

use thiserror::Error;

use crate::BackendError;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the clickloop engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings could not be loaded, saved or validated.
    #[error("Settings error: {0}")]
    Config(#[from] config::Error),

    /// The input backend refused or failed an operation.
    #[error("Input backend error: {0}")]
    Backend(#[from] BackendError),

    /// The UI event channel has been closed by the receiver.
    #[error("UI channel closed")]
    ChannelClosed,

    /// I/O failure while performing a system operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Human-friendly rendering; settings errors use their own pretty form.
    pub fn pretty(&self) -> String {
        match self {
            Self::Config(e) => e.pretty(),
            other => other.to_string(),
        }
    }
}
