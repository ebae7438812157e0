// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors raised while reading and checking Warden configuration.

use std::path::{Path, PathBuf};

use thiserror::Error;
use warden_auth::AuthError;

/// Where a document came from when it was not read from disk.
pub const INLINE_ORIGIN: &str = "<inline>";

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure to produce a usable [`WardenConfig`](crate::WardenConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not well-formed or does not match the schema.
    #[error("{origin}: {message}")]
    Syntax {
        /// File path, or [`INLINE_ORIGIN`].
        origin: String,
        /// Parser message.
        message: String,
    },

    /// A value parsed but is not acceptable.
    #[error("{field}: {message}")]
    Validation {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was requested.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `WARDEN_*` override holds a value of the wrong kind.
    #[error("environment variable {name}: {message}")]
    Env {
        /// Variable name including the prefix.
        name: String,
        /// Expected shape of the value.
        message: String,
    },

    /// The file extension is not yaml, yml, toml or json.
    #[error("{}: unrecognized config format", path.display())]
    UnknownFormat {
        /// File whose extension was rejected.
        path: PathBuf,
    },
}

impl ConfigError {
    pub(crate) fn syntax(message: impl ToString) -> Self {
        Self::Syntax {
            origin: INLINE_ORIGIN.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a validation error for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn env(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Env {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Replaces the inline origin of a syntax error with `path`.
    pub(crate) fn at(self, path: &Path) -> Self {
        match self {
            Self::Syntax { message, .. } => Self::Syntax {
                origin: path.display().to_string(),
                message,
            },
            other => other,
        }
    }

    /// Returns `true` if the requested file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    /// Short category name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntax",
            Self::Validation { .. } => "validation",
            Self::Read { .. } => "read",
            Self::Env { .. } => "env",
            Self::UnknownFormat { .. } => "format",
        }
    }
}

impl From<AuthError> for ConfigError {
    fn from(err: AuthError) -> Self {
        let message = match err {
            AuthError::InvalidConfig(message) => message,
            other => other.to_string(),
        };
        Self::validation("auth", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_origin() {
        let error = ConfigError::syntax("expected value at line 1");
        assert_eq!(error.to_string(), "<inline>: expected value at line 1");

        let error = error.at(Path::new("/etc/warden.json"));
        assert_eq!(error.to_string(), "/etc/warden.json: expected value at line 1");
        assert_eq!(error.kind(), "syntax");
    }

    #[test]
    fn test_at_leaves_other_errors() {
        let error = ConfigError::validation("server.port", "must be non-zero").at(Path::new("x.yaml"));
        assert_eq!(error.to_string(), "server.port: must be non-zero");
    }

    #[test]
    fn test_not_found() {
        let missing = ConfigError::Read {
            path: PathBuf::from("warden.yaml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(missing.is_not_found());

        let denied = ConfigError::Read {
            path: PathBuf::from("warden.yaml"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!denied.is_not_found());
        assert!(!ConfigError::env("WARDEN_SERVER_PORT", "expected a port").is_not_found());
    }

    #[test]
    fn test_auth_error_becomes_validation() {
        let error: ConfigError = AuthError::invalid_config("bearer.secret_key is required").into();
        assert!(matches!(
            error,
            ConfigError::Validation { ref field, ref message }
                if field == "auth" && message == "bearer.secret_key is required"
        ));
    }
}
