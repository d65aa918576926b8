//! Error handling for the clickloop binary.

use std::{io, result};

use clickloop_engine::BackendError;
use thiserror::Error;

/// Convenient result type for the binary.
pub type Result<T> = result::Result<T, Error>;

/// Errors that end the process.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Settings could not be loaded or validated.
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    /// Errors from the session engine.
    #[error("{0}")]
    Engine(#[from] clickloop_engine::Error),
    /// The input backend could not be opened.
    #[error("Input backend error: {0}")]
    Backend(#[from] BackendError),
    /// A run ended in failure.
    #[error("Run failed: {0}")]
    RunFailed(String),
}

impl Error {
    /// Human-friendly rendering for the terminal.
    pub fn pretty(&self) -> String {
        match self {
            Self::Config(e) => e.pretty(),
            Self::Engine(e) => e.pretty(),
            other => other.to_string(),
        }
    }
}
