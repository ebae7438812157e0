// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `hash-password` command.

use std::io::BufRead;

use crate::cli::{Cli, HashPasswordArgs};
use crate::error::{BinError, BinResult};

/// Executes the `hash-password` command: prints an Argon2 PHC string.
pub fn hash_password(_cli: &Cli, args: HashPasswordArgs) -> BinResult<()> {
    let password = match args.password {
        Some(password) if !args.stdin => password,
        _ => read_password(std::io::stdin().lock())?,
    };
    if password.is_empty() {
        return Err(BinError::invalid_argument("password must not be empty"));
    }

    println!("{}", warden_auth::hash_password(&password)?);
    Ok(())
}

/// Reads the first line of `reader` without its line ending.
pub fn read_password(mut reader: impl BufRead) -> BinResult<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
