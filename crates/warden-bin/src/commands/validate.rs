// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use serde_json::Value;
use warden_config::{ConfigLoader, WardenConfig};

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    let config = ConfigLoader::new()
        .load(config_path)
        .map_err(|e| BinError::config(config_path, e))?;
    let warnings = config.warnings();
    let auth = &config.auth;

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Listen:       {}", config.server.socket_addr());
            println!("  Algorithm:    {:?}", auth.bearer.algorithm);
            println!("  Issuer:       {}", auth.bearer.issuer.as_deref().unwrap_or("(any)"));
            println!("  Audience:     {}", auth.bearer.audience.as_deref().unwrap_or("(any)"));
            println!("  Public paths: {}", auth.public_paths.join(", "));
            println!("  RBAC:         {}", enabled(auth.rbac.enabled));
            println!("  Rate limit:   {}", enabled(auth.rate_limit.enabled));
            println!("  Revocation:   {}", enabled(auth.revocation.enabled));

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", pretty(&config_json(&config)));
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "listen": config.server.socket_addr().to_string(),
                    "issuer": auth.bearer.issuer,
                    "audience": auth.bearer.audience,
                    "public_paths": auth.public_paths,
                    "rbac_enabled": auth.rbac.enabled,
                    "rate_limit_enabled": auth.rate_limit.enabled,
                    "revocation_enabled": auth.revocation.enabled,
                },
                "warnings": warnings,
                "config": if args.show_config { Some(config_json(&config)) } else { None },
            });
            println!("{}", pretty(&output));
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::StrictWarnings {
            count: warnings.len(),
        });
    }

    Ok(())
}

/// Serializes `config` for display. The bearer secret is never serialized.
pub fn config_json(config: &WardenConfig) -> Value {
    serde_json::to_value(config).unwrap_or(Value::Null)
}

fn enabled(flag: bool) -> &'static str {
    if flag { "enabled" } else { "disabled" }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "(serialization error)".to_string())
}
