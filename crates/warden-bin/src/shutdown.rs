// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! A single `watch` flag flips once, either from an OS signal (SIGTERM,
//! SIGINT) or from [`ShutdownCoordinator::initiate_shutdown`]. Subscribers
//! created before or after the flip both observe it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Owns the shutdown flag.
///
/// ```ignore
/// let coordinator = ShutdownCoordinator::new();
/// let server = axum::serve(listener, app)
///     .with_graceful_shutdown(coordinator.shutdown_signal().wait());
/// coordinator.wait_for_shutdown().await;
/// ```
#[derive(Clone)]
pub struct ShutdownCoordinator {
    flag: Arc<watch::Sender<bool>>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator that has not been triggered.
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    /// Returns a handle that resolves once shutdown is initiated.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.flag.subscribe(),
        }
    }

    /// Flips the flag. Later calls are no-ops.
    pub fn initiate_shutdown(&self) {
        let already = self.flag.send_replace(true);
        if !already {
            info!("Shutdown initiated");
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves on the first OS signal or programmatic shutdown.
    pub async fn wait_for_shutdown(&self) {
        let signal = self.shutdown_signal();
        tokio::select! {
            _ = signal.wait() => {}
            _ = wait_for_os_signal() => self.initiate_shutdown(),
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_os_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Signal handlers unavailable; listening for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

// =============================================================================
// ShutdownSignal
// =============================================================================

/// Resolves when shutdown is signaled.
///
/// Pass [`wait`](Self::wait) to axum's `with_graceful_shutdown`.
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits for the flag. Returns at once if it already flipped.
    pub async fn wait(mut self) {
        // Err only if the coordinator is gone, which also means shut down.
        let _ = self.receiver.wait_for(|down| *down).await;
    }
}

// =============================================================================
// Tests
// =============================================================================
