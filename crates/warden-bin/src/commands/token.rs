// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `token` command.

use warden_auth::{IdentityContext, IssuedToken, TokenIssuer};
use warden_config::{ConfigLoader, WardenConfig};

use crate::cli::{Cli, TokenArgs};
use crate::error::{BinError, BinResult};

/// Executes the `token` command: prints a signed token on stdout.
pub fn token(cli: &Cli, args: TokenArgs) -> BinResult<()> {
    let config = ConfigLoader::new()
        .load(&cli.config)
        .map_err(|e| BinError::config(&cli.config, e))?;
    let issued = mint_token(&config, &args)?;

    println!("{}", issued.token);
    eprintln!(
        "jti={} expires_at={}",
        issued.jti.as_deref().unwrap_or("-"),
        issued.expires_at.to_rfc3339()
    );
    Ok(())
}

/// Signs a token for `args` with the configured HMAC secret.
pub fn mint_token(config: &WardenConfig, args: &TokenArgs) -> BinResult<IssuedToken> {
    let subject = args.sub.trim();
    if subject.is_empty() {
        return Err(BinError::invalid_argument("--sub must not be blank"));
    }

    let ttl_secs = args.ttl.unwrap_or(config.auth.token_ttl_secs);
    let ttl = i64::try_from(ttl_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| BinError::invalid_argument(format!("--ttl {ttl_secs} is out of range")))?;
    let issuer = TokenIssuer::new(&config.auth.bearer, ttl)?;

    let mut builder = IdentityContext::builder(subject)
        .roles(args.roles.iter().cloned())
        .permissions(args.permissions.iter().cloned());
    if let Some(email) = &args.email {
        builder = builder.email(email);
    }

    Ok(issuer.issue(&builder.build())?)
}
