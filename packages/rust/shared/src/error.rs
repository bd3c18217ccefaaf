//! Error types for Agency LeadGen.
//!
//! Library crates use [`LeadGenError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all LeadGen operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadGenError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while searching or scraping.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or structured-output parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Agency discovery could not produce any identity data.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// A single generative-text call failed (timeout, bad reply, rate limit).
    #[error("generation error: {0}")]
    Generation(String),

    /// A capability provider cannot run at all (credential missing or
    /// rejected, backend unreachable). Stage runners degrade the whole stage.
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    /// Tabular sink error (CSV write, spreadsheet API).
    #[error("export error: {0}")]
    Export(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty input, malformed record, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadGenError>;

impl LeadGenError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
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

    /// Whether this error means the provider itself is unusable, as opposed
    /// to a failure scoped to one record.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = LeadGenError::config("OPENAI_API_KEY is required but not set");
        assert_eq!(
            err.to_string(),
            "config error: OPENAI_API_KEY is required but not set"
        );

        let err = LeadGenError::validation("cannot export an empty lead list");
        assert!(err.to_string().contains("empty lead list"));
    }

    #[test]
    fn unavailable_is_distinguished() {
        assert!(LeadGenError::Unavailable("401".into()).is_unavailable());
        assert!(!LeadGenError::Generation("timeout".into()).is_unavailable());
        assert!(!LeadGenError::Network("reset".into()).is_unavailable());
    }
}
