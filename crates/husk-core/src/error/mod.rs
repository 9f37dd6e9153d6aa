//! Error types and result aliases for husk operations.
//!
//! Provides a unified error type for everything that can go wrong while
//! reading an installed tree. Constraint violations (invalid versions,
//! missing dependencies) are not errors: they are flags on the resolved
//! graph.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all husk operations
#[derive(Error, Debug)]
pub enum HuskError {
    // Config errors
    #[error("Failed to parse husk.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Failed to parse package.json: {message}")]
    JsonParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Version errors
    #[error("Invalid version '{input}'")]
    InvalidVersion { input: String },

    #[error("Invalid version range '{input}'")]
    InvalidRange { input: String },

    // Resolution errors
    #[error("Cannot read package tree at {}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal resolver error: {message}")]
    Internal { message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for husk operations
pub type HuskResult<T> = Result<T, HuskError>;

impl HuskError {
    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create the error reported when the root location itself cannot be read
    pub fn root_unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RootUnreadable {
            path: path.into(),
            source,
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            HuskError::RootUnreadable { .. } => {
                Some("Check that the path exists and that you have permission to read it")
            },
            HuskError::TomlParse { .. } => Some("Fix the syntax error in husk.toml and try again"),
            HuskError::ConfigValidation { .. } => {
                Some("Check the [resolve] table in husk.toml and any HUSK_* environment variables")
            },
            HuskError::Internal { .. } => {
                Some("This is a bug in husk; please report it with the tree that triggered it")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unreadable_message() {
        let err = HuskError::root_unreadable(
            "/nowhere/app",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );

        assert_eq!(err.to_string(), "Cannot read package tree at /nowhere/app");
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_parse_errors_have_no_suggestion() {
        let parse = HuskError::JsonParse {
            message: "expected value".to_string(),
        };
        assert_eq!(parse.suggestion(), None);
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;

        let err = HuskError::io(
            "Failed to list node_modules".to_string(),
            std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
        );
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "disk on fire");
    }
}
