// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bearer authentication middleware.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use warden_auth::{AuthGateway, GatewayRequest};

use crate::error::ApiError;

// =============================================================================
// AuthLayer
// =============================================================================

/// Layer that runs every request through the [`AuthGateway`].
///
/// On success the resulting `Arc<IdentityContext>` is stored in the request
/// extensions. Anonymous contexts are stored for public paths.
#[derive(Clone)]
pub struct AuthLayer {
    gateway: Arc<AuthGateway>,
    retry_after: Option<u64>,
}

impl AuthLayer {
    /// Creates a new auth layer.
    pub fn new(gateway: Arc<AuthGateway>) -> Self {
        Self {
            gateway,
            retry_after: None,
        }
    }

    /// Sets the `Retry-After` hint sent with throttled responses.
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            gateway: self.gateway.clone(),
            retry_after: self.retry_after,
        }
    }
}

// =============================================================================
// AuthMiddleware
// =============================================================================

/// Middleware for bearer authentication.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    gateway: Arc<AuthGateway>,
    retry_after: Option<u64>,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let gateway = self.gateway.clone();
        let retry_after = self.retry_after;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path().to_string();
            let authorization = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let client = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string());

            let mut request = GatewayRequest::new(&path);
            if let Some(value) = authorization.as_deref() {
                request = request.with_authorization(value);
            }
            if let Some(key) = client.as_deref() {
                request = request.with_client(key);
            }

            match gateway.authorize(&request).await {
                Ok(decision) => {
                    req.extensions_mut().insert(decision.into_identity());
                    inner.call(req).await
                }
                Err(e) => {
                    let mut error = ApiError::from(e);
                    if let Some(seconds) = retry_after {
                        error = error.with_retry_after(seconds);
                    }
                    Ok(error.into_response())
                }
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
