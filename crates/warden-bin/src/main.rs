// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Warden authorization engine.
//!
//! Main binary entry point.

use warden_bin::error::report_error_and_exit;
use warden_bin::{commands, init_logging, Cli};
use warden_config::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // The logging section is read before the command validates the file.
    let file_logging = ConfigLoader::new().parse(&cli.config).ok().map(|c| c.logging);
    init_logging(
        &cli.effective_log_level(file_logging.as_ref()),
        cli.effective_log_format(file_logging.as_ref()),
    );

    if let Err(e) = commands::execute(cli).await {
        report_error_and_exit(e);
    }
}
