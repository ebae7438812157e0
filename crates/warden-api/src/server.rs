// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server implementation.

use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use warden_auth::Action;
use warden_config::ServerConfig;

use crate::error::{ApiError, ApiResult};
use crate::handlers;
use crate::middleware::{AuthLayer, RbacLayer};
use crate::state::AppState;

/// Routes guarded by `delete:Auth.Session`.
const ADMIN_ACTION: Action = Action::Delete;

/// Serves the Warden HTTP API.
pub struct ApiServer {
    state: AppState,
    config: ServerConfig,
}

impl ApiServer {
    /// Creates a new API server with the given state.
    pub fn new(state: AppState, config: ServerConfig) -> Self {
        Self { state, config }
    }

    /// Builds the router.
    ///
    /// Every route passes through the [`AuthLayer`]; admin routes also need
    /// `delete` on `Auth.Session`.
    pub fn router(&self) -> Router {
        let mut auth = AuthLayer::new(self.state.gateway.clone());
        if let Some(seconds) = self.state.client_retry_after_secs {
            auth = auth.with_retry_after(seconds);
        }

        let middleware_stack = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.config.request_timeout(),
            ))
            .layer(auth);

        let admin = Router::new()
            .route("/api/v1/admin/tokens/{jti}/revoke", post(handlers::revoke_token))
            .route(
                "/api/v1/admin/users/{subject_id}/revoke-sessions",
                post(handlers::revoke_sessions),
            )
            .route_layer(RbacLayer::require(
                self.state.rbac_policy.clone(),
                ADMIN_ACTION,
                "Auth",
                Some("Session"),
            ));

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/v1/auth/register", post(handlers::register))
            .route("/api/v1/auth/login", post(handlers::login))
            .route("/api/v1/auth/me", get(handlers::current_identity))
            .route("/api/v1/auth/logout", post(handlers::logout))
            .merge(admin)
            .layer(middleware_stack)
            .with_state(self.state.clone())
    }

    /// Binds the configured address and serves until `shutdown_signal` resolves.
    ///
    /// The client address is exposed to the [`AuthLayer`] through `ConnectInfo`.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> ApiResult<()> {
        let addr = self.addr();
        let router = self.router();

        info!(%addr, "Listening");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ApiError::Bind { addr, source })?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(ApiError::Serve)?;

        info!("HTTP server stopped");

        Ok(())
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.config.socket_addr()
    }
}
