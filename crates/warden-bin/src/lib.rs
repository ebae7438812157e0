// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # warden-bin
//!
//! CLI binary for the Warden authorization engine.
//!
//! - CLI argument parsing with clap
//! - Server runtime with graceful shutdown
//! - Logging initialization
//! - Command implementations (run, validate, token, hash-password, version)
//!
//! ## Usage
//!
//! ```bash
//! # Serve the API (default command)
//! warden -c /etc/warden/warden.yaml
//!
//! # Validate configuration, failing on warnings
//! warden validate --strict
//!
//! # Mint a development token
//! warden token --sub alice --role admin
//!
//! # Hash a password for a user store
//! warden hash-password --stdin
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{RuntimeBuilder, ServerRuntime};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
