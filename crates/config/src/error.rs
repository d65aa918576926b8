//! Error types for settings loading, saving and validation.

use std::{
    cmp::{max, min},
    fmt::Write as _,
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors produced while loading, saving, or validating settings.
pub enum Error {
    #[error("{message}")]
    /// I/O or filesystem read error.
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// I/O or filesystem write error.
    Write {
        /// Optional path associated with the write error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// JSON syntax or type error with a concrete line/column location.
    Parse {
        /// Optional path associated with the parse error.
        path: Option<PathBuf>,
        /// 1-based line number.
        line: usize,
        /// 1-based column number.
        col: usize,
        /// Human-readable error message.
        message: String,
        /// Rendered excerpt including a caret at the error location.
        excerpt: String,
    },
    #[error("{field}: {message}")]
    /// A setting holds a value a run cannot start with.
    Validation {
        /// Settings field at fault.
        field: String,
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Shorthand for a validation error on `field`.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Render a human-friendly error message including location and an excerpt when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {}", p.display(), message),
                None => format!("Read error: {}", message),
            },
            Self::Write { path, message } => match path {
                Some(p) => format!("Write error at {}: {}", p.display(), message),
                None => format!("Write error: {}", message),
            },
            Self::Parse {
                path,
                line,
                col,
                message,
                excerpt,
            } => match path {
                Some(p) => format!(
                    "Settings parse error at {}:{}:{}\n{}\n{}",
                    p.display(),
                    line,
                    col,
                    message,
                    excerpt
                ),
                None => format!(
                    "Settings parse error at line {}, column {}\n{}\n{}",
                    line, col, message, excerpt
                ),
            },
            Self::Validation { field, message } => {
                format!("Invalid setting `{}`: {}", field, message)
            }
        }
    }

    /// Access the optional path attached to this error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Write { path, .. } | Self::Parse { path, .. } => {
                path.as_deref()
            }
            Self::Validation { .. } => None,
        }
    }
}

/// Build a small 2-3 line excerpt with a caret at `(line_no, col_no)`.
pub fn excerpt_at(source: &str, line_no: usize, col_no: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len();
    let start = max(1usize, line_no.saturating_sub(2));
    let end = min(total, line_no + 1);

    let mut out = String::new();
    for n in start..=end {
        let text = lines.get(n - 1).copied().unwrap_or("");
        let _ignored = writeln!(out, " {:>4} | {}", n, text);
        if n == line_no {
            let prefix = format!(" {:>4} | ", n);
            let _ignored = writeln!(
                out,
                "{}{}^",
                " ".repeat(prefix.len()),
                " ".repeat(col_no.saturating_sub(1))
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_marks_column() {
        let src = "{\n  \"a\": 1,\n  \"b\": x\n}";
        let ex = excerpt_at(src, 3, 8);
        assert!(ex.contains("   3 |   \"b\": x"));
        let caret = ex.lines().find(|l| l.trim_end().ends_with('^')).unwrap();
        assert_eq!(caret.find('^'), Some(8 + 7));
    }

    #[test]
    fn pretty_validation_names_field() {
        let e = Error::validation("fixed_x", "missing");
        assert_eq!(e.pretty(), "Invalid setting `fixed_x`: missing");
        assert_eq!(e.to_string(), "fixed_x: missing");
    }
}
