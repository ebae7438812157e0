// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscriber setup for the `warden` binary.

use std::io::IsTerminal;

use tracing_subscriber::{
    filter::Directive, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};
use warden_config::LogFormat;

/// Crates whose logs are capped regardless of the requested level.
const NOISY_CRATES: [&str; 2] = ["hyper=warn", "tower=warn"];

/// Installs the global subscriber.
///
/// `RUST_LOG`, when set, takes precedence over `level`. A second call is a
/// no-op.
pub fn init_logging(level: &str, format: LogFormat) {
    let ansi = std::io::stdout().is_terminal();
    let output = match format {
        LogFormat::Text => fmt::layer().with_ansi(ansi).boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_ansi(ansi)
            .boxed(),
        // Span context lets log pipelines group a request's gateway stages.
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
    };

    let _ = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(output)
        .try_init();
}

/// Builds the filter from `RUST_LOG` or `level`, with noisy crates capped.
pub fn build_filter(level: &str) -> EnvFilter {
    let base = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    NOISY_CRATES
        .iter()
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(base, EnvFilter::add_directive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_caps_noisy_crates() {
        let filter = build_filter("debug").to_string();
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("tower=warn"));
    }

    #[test]
    fn test_build_filter_falls_back_on_garbage() {
        let filter = build_filter("not a [valid directive").to_string();
        assert!(filter.contains("hyper=warn"));
    }
}
