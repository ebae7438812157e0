// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: Serve the API (default)
//! - `validate`: Validate configuration file
//! - `token`: Mint a development token
//! - `hash-password`: Hash a password into a PHC string
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use warden_config::LoggingConfig;

// =============================================================================
// Main CLI Structure
// =============================================================================

/// Warden - bearer token authorization engine
#[derive(Parser, Debug)]
#[command(
    name = "warden",
    author = "Sylvex <contact@sylvex.io>",
    version = crate::VERSION,
    about = "Bearer token authorization engine",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "warden.yaml",
        env = "WARDEN_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format. Overrides the config file.
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the Warden CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the HTTP API
    ///
    /// This is the default command when no subcommand is specified.
    Run(RunArgs),

    /// Validate the configuration file
    ///
    /// Parses and validates the configuration without starting the server.
    Validate(ValidateArgs),

    /// Mint a bearer token with the configured HMAC secret
    ///
    /// Intended for development and smoke tests.
    Token(TokenArgs),

    /// Hash a password into an Argon2 PHC string
    #[command(name = "hash-password")]
    HashPassword(HashPasswordArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Development mode: generate an ephemeral secret when none is configured
    #[arg(long, env = "WARDEN_DEV_MODE")]
    pub dev_mode: bool,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation (secrets redacted)
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `token` command.
#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    /// Subject id
    #[arg(long)]
    pub sub: String,

    /// Role to embed (repeatable)
    #[arg(long = "role")]
    pub roles: Vec<String>,

    /// Permission to embed (repeatable)
    #[arg(long = "permission")]
    pub permissions: Vec<String>,

    /// Email to embed
    #[arg(long)]
    pub email: Option<String>,

    /// Lifetime in seconds (default: auth.token_ttl_secs)
    #[arg(long)]
    pub ttl: Option<u64>,
}

/// Arguments for the `hash-password` command.
#[derive(Args, Debug, Clone)]
pub struct HashPasswordArgs {
    /// Password to hash
    #[arg(required_unless_present = "stdin")]
    pub password: Option<String>,

    /// Read the password from stdin
    #[arg(long)]
    pub stdin: bool,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<LogFormat> for warden_config::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Text => warden_config::LogFormat::Text,
            LogFormat::Json => warden_config::LogFormat::Json,
            LogFormat::Compact => warden_config::LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Get the effective log level: flags, then `--log-level`, then the file.
    pub fn effective_log_level(&self, file: Option<&LoggingConfig>) -> String {
        if self.quiet {
            "warn".to_string()
        } else if self.verbose {
            "debug".to_string()
        } else if let Some(level) = &self.log_level {
            level.clone()
        } else {
            file.map(|l| l.level.as_str()).unwrap_or("info").to_string()
        }
    }

    /// Get the effective log format: `--log-format`, then the file.
    pub fn effective_log_format(&self, file: Option<&LoggingConfig>) -> warden_config::LogFormat {
        match self.log_format {
            Some(format) => format.into(),
            None => file.map(|l| l.format).unwrap_or_default(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use warden_config::LogLevel;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["warden"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Run(_)));
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["warden", "validate", "--strict"]);
        if let Some(Commands::Validate(args)) = cli.command {
            assert!(args.strict);
            assert!(!args.show_config);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_token_command() {
        let cli = Cli::parse_from([
            "warden", "token", "--sub", "alice", "--role", "admin", "--role", "viewer",
        ]);
        if let Some(Commands::Token(args)) = cli.command {
            assert_eq!(args.sub, "alice");
            assert_eq!(args.roles, vec!["admin", "viewer"]);
            assert!(args.ttl.is_none());
        } else {
            panic!("Expected Token command");
        }
    }

    #[test]
    fn test_hash_password_requires_input() {
        assert!(Cli::try_parse_from(["warden", "hash-password"]).is_err());
        assert!(Cli::try_parse_from(["warden", "hash-password", "--stdin"]).is_ok());
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["warden", "-c", "/etc/warden/warden.yaml"]);
        assert_eq!(cli.config, PathBuf::from("/etc/warden/warden.yaml"));
    }

    #[test]
    fn test_log_level_precedence() {
        let file = LoggingConfig {
            level: LogLevel::Error,
            format: warden_config::LogFormat::Json,
        };

        let cli = Cli::parse_from(["warden"]);
        assert_eq!(cli.effective_log_level(Some(&file)), "error");
        assert_eq!(cli.effective_log_level(None), "info");
        assert_eq!(cli.effective_log_format(Some(&file)), warden_config::LogFormat::Json);

        let cli = Cli::parse_from(["warden", "-l", "trace", "--log-format", "compact"]);
        assert_eq!(cli.effective_log_level(Some(&file)), "trace");
        assert_eq!(cli.effective_log_format(Some(&file)), warden_config::LogFormat::Compact);

        let cli = Cli::parse_from(["warden", "-q", "-l", "trace"]);
        assert_eq!(cli.effective_log_level(Some(&file)), "warn");
    }
}
