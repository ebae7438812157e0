// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Prints the versions of every workspace crate.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("warden {}", crate::VERSION);
    for (name, version) in component_versions() {
        println!("  {name:<14}{version}");
    }
    println!(
        "  {:<14}{}-{}",
        "target",
        std::env::consts::ARCH,
        std::env::consts::OS
    );
    Ok(())
}

fn component_versions() -> [(&'static str, &'static str); 3] {
    [
        ("warden-auth", warden_auth::VERSION),
        ("warden-api", warden_api::VERSION),
        ("warden-config", warden_config::VERSION),
    ]
}
