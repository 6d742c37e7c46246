//! Error types for PaperDigest.
//!
//! Library crates use [`PaperdigestError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all PaperDigest operations.
#[derive(Debug, thiserror::Error)]
pub enum PaperdigestError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP failure while fetching a page or asset.
    #[error("fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// A fetch gave up after the configured number of attempts.
    #[error("fetch of {url} exhausted {attempts} attempts")]
    ExhaustedRetries { url: String, attempts: u32 },

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// No section matched a keyword path after all extraction attempts.
    #[error("no section found for {path}")]
    SectionNotFound { path: String },

    /// A downloaded payload failed validation (truncated, not an image, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PaperdigestError>;

impl PaperdigestError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch error with the URL that failed.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a section-not-found error from a keyword path.
    pub fn section_not_found(path: impl Into<String>) -> Self {
        Self::SectionNotFound { path: path.into() }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
