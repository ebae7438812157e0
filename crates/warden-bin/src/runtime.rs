// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server runtime orchestration.
//!
//! Loads configuration, builds the engine state, serves the API and drains
//! in-flight requests on shutdown.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use warden_api::{ApiServer, AppState};
use warden_config::{ConfigLoader, WardenConfig, INLINE_ORIGIN};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// ServerRuntime
// =============================================================================

/// Runs the API server until shutdown is signaled.
pub struct ServerRuntime {
    config: WardenConfig,
    shutdown: ShutdownCoordinator,
}

impl ServerRuntime {
    /// Creates a runtime for a validated configuration.
    pub fn new(config: WardenConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// Returns the shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Serves until an OS signal arrives, then drains for `server.shutdown_timeout_secs`.
    pub async fn run(self) -> BinResult<()> {
        info!("Starting Warden v{}", crate::VERSION);

        for warning in self.config.warnings() {
            warn!("{}", warning);
        }

        let state = AppState::from_config(&self.config.auth)?;
        let server = ApiServer::new(state, self.config.server.clone());
        let signal = self.shutdown.shutdown_signal();
        let mut handle = tokio::spawn(server.run_with_shutdown(signal.wait()));

        tokio::select! {
            result = &mut handle => {
                // The server stopped on its own, typically a bind failure.
                return join_result(result);
            }
            _ = self.shutdown.wait_for_shutdown() => {}
        }

        let grace = self.config.server.shutdown_timeout();
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(result) => join_result(result)?,
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "Shutdown grace period elapsed; aborting");
                handle.abort();
            }
        }

        info!("Warden shutdown complete");
        Ok(())
    }
}

fn join_result(
    result: Result<warden_api::ApiResult<()>, tokio::task::JoinError>,
) -> BinResult<()> {
    match result {
        Ok(outcome) => outcome.map_err(BinError::from),
        Err(e) => Err(BinError::Task(e.to_string())),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the server runtime.
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<WardenConfig>,
    loader: ConfigLoader,
    dev_mode: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_path: None,
            config: None,
            loader: ConfigLoader::new(),
            dev_mode: false,
        }
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: WardenConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the loader used for the configuration file.
    pub fn loader(mut self, loader: ConfigLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Enables development mode: a missing HMAC secret is generated.
    pub fn dev_mode(mut self, enabled: bool) -> Self {
        self.dev_mode = enabled;
        self
    }

    /// Builds the runtime, validating the configuration.
    pub fn build(self) -> BinResult<ServerRuntime> {
        let origin = self
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(INLINE_ORIGIN));
        let mut config = match self.config {
            Some(config) => config,
            None => {
                let path = self.config_path.ok_or_else(|| {
                    BinError::invalid_argument("no configuration file or value provided")
                })?;
                self.loader
                    .parse(&path)
                    .map_err(|e| BinError::config(&path, e))?
            }
        };

        if self.dev_mode && config.auth.bearer.ensure_development_secret() {
            warn!("Development mode: tokens will not survive a restart");
        }
        config.validate().map_err(|e| BinError::config(&origin, e))?;

        Ok(ServerRuntime::new(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use warden_auth::AuthConfig;

    #[test]
    fn test_runtime_builder_requires_config() {
        assert!(RuntimeBuilder::new().build().is_err());
    }

    #[test]
    fn test_runtime_builder_rejects_missing_secret() {
        let result = RuntimeBuilder::new().config(WardenConfig::default()).build();
        assert_eq!(
            result.err().map(|e| e.exit_code()),
            Some(crate::error::EXIT_CONFIG)
        );
    }

    #[test]
    fn test_runtime_builder_loads_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        std::io::Write::write_all(
            &mut file,
            b"server:\n  port: 9393\nauth:\n  bearer:\n    secret_key: runtime-file-secret-0123456789abcdef\n",
        )
        .unwrap();

        let loader = ConfigLoader::new().with_env_lookup(|_| None);
        let runtime = RuntimeBuilder::new()
            .loader(loader)
            .config_path(file.path())
            .build()
            .unwrap();
        assert_eq!(runtime.config().server.port, 9393);
    }

    #[test]
    fn test_dev_mode_generates_secret() {
        let runtime = RuntimeBuilder::new()
            .config(WardenConfig::default())
            .dev_mode(true)
            .build()
            .unwrap();
        assert!(runtime.config().auth.bearer.secret_key.is_some());
    }

    #[test]
    fn test_runtime_builder_keeps_configured_secret() {
        let config = WardenConfig {
            auth: AuthConfig::with_secret("runtime-test-secret-0123456789abcdef"),
            ..Default::default()
        };
        let runtime = RuntimeBuilder::new().config(config).dev_mode(true).build().unwrap();
        assert_eq!(
            runtime.config().auth.bearer.secret_key.as_deref(),
            Some("runtime-test-secret-0123456789abcdef")
        );
    }
}
