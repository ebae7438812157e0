// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use tracing::{info, warn};

use crate::cli::{Cli, RunArgs};
use crate::error::BinResult;
use crate::runtime::RuntimeBuilder;

/// Serves the API until SIGTERM or SIGINT.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    info!(config = %cli.config.display(), "Loading configuration");
    if args.dev_mode {
        warn!("Development mode enabled; do not use in production");
    }

    RuntimeBuilder::new()
        .config_path(&cli.config)
        .dev_mode(args.dev_mode)
        .build()?
        .run()
        .await
}
