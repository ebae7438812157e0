// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the Warden binary.
//!
//! Exit codes follow `sysexits.h` so wrappers can tell a bad invocation from
//! a bad configuration file or a server that died.

use thiserror::Error;
use warden_api::ApiError;
use warden_auth::AuthError;
use warden_config::ConfigError;

/// Result type alias for warden-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// `EX_USAGE`: bad command line input.
pub const EXIT_USAGE: i32 = 64;
/// `EX_DATAERR`: input rejected by the engine.
pub const EXIT_DATA: i32 = 65;
/// `EX_SOFTWARE`: the server failed while running.
pub const EXIT_SOFTWARE: i32 = 70;
/// `EX_IOERR`: reading input or binding failed.
pub const EXIT_IO: i32 = 74;
/// `EX_CONFIG`: the configuration file is unusable.
pub const EXIT_CONFIG: i32 = 78;

/// Errors surfaced by `warden` subcommands.
#[derive(Debug, Error)]
pub enum BinError {
    /// A flag or argument value was rejected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `validate --strict` found warnings.
    #[error("{count} configuration warning(s) in strict mode")]
    StrictWarnings {
        /// Number of warnings reported.
        count: usize,
    },

    /// Loading or validating the configuration failed.
    #[error("configuration rejected: {path}")]
    Config {
        /// The configuration file.
        path: String,
        /// The underlying error.
        #[source]
        source: ConfigError,
    },

    /// The engine refused to build or to mint.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The HTTP server failed.
    #[error(transparent)]
    Server(#[from] ApiError),

    /// The server task panicked or was cancelled.
    #[error("Server task failed: {0}")]
    Task(String),

    /// Reading from the terminal or stdin failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BinError {
    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Wraps a configuration error for `path`.
    pub fn config(path: &std::path::Path, source: ConfigError) -> Self {
        Self::Config {
            path: path.display().to_string(),
            source,
        }
    }

    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) => EXIT_USAGE,
            Self::StrictWarnings { .. } => 1,
            Self::Config { .. } => EXIT_CONFIG,
            Self::Auth(AuthError::InvalidConfig(_)) => EXIT_CONFIG,
            Self::Auth(_) => EXIT_DATA,
            Self::Server(_) | Self::Task(_) => EXIT_SOFTWARE,
            Self::Io(_) => EXIT_IO,
        }
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Prints an error and its cause chain to stderr.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {cause}");
        source = cause.source();
    }
}

/// Reports an error and exits with its code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================
