// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `run`: Serve the HTTP API
//! - `validate`: Validate configuration file
//! - `token`: Mint a development token
//! - `hash-password`: Hash a password
//! - `version`: Show version information

mod hash_password;
mod run;
mod token;
mod validate;
mod version;

pub use hash_password::{hash_password, read_password};
pub use run::run;
pub use token::{mint_token, token};
pub use validate::{config_json, validate};
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Run(args) => run::run(&cli, args).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Token(args) => token::token(&cli, args),
        Commands::HashPassword(args) => hash_password::hash_password(&cli, args),
        Commands::Version => version::version(&cli),
    }
}
