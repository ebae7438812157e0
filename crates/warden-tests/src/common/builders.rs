// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Harnesses for driving the gateway directly and the HTTP API in-process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use warden_api::{ApiServer, AppState};
use warden_auth::{
    AuthConfig, AuthGateway, AuthResult, GatewayDecision, GatewayRequest, InMemoryRateLimiter,
    InMemoryRevocationStore, ManualClock, PublicPaths, RateLimitConfig, RbacPolicy,
    RevocationFailureMode, RevocationStore,
};
use warden_config::ServerConfig;

use super::fixtures::{bearer, test_auth_config, test_validator, PROTECTED_PATH};

// =============================================================================
// GatewayHarness
// =============================================================================

/// A gateway wired to in-memory collaborators on a manual clock.
pub struct GatewayHarness {
    /// Clock driving the store and the client limiter.
    pub clock: Arc<ManualClock>,
    /// The in-memory revocation store, unless replaced.
    pub store: Arc<InMemoryRevocationStore>,
    /// The client limiter, when enabled.
    pub client_limiter: Option<Arc<InMemoryRateLimiter>>,
    /// The gateway under test.
    pub gateway: AuthGateway,
}

impl GatewayHarness {
    /// Creates a harness with defaults.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts a harness builder.
    pub fn builder() -> GatewayHarnessBuilder {
        GatewayHarnessBuilder::default()
    }

    /// Authorizes a call to the protected path carrying `token`.
    pub async fn authorize(&self, token: &str) -> AuthResult<GatewayDecision> {
        let header = bearer(token);
        self.gateway
            .authorize(&GatewayRequest::new(PROTECTED_PATH).with_authorization(&header))
            .await
    }

    /// Authorizes a call from `client` with an optional raw `Authorization` header.
    pub async fn authorize_from(
        &self,
        client: &str,
        path: &str,
        authorization: Option<&str>,
    ) -> AuthResult<GatewayDecision> {
        let mut request = GatewayRequest::new(path).with_client(client);
        if let Some(value) = authorization {
            request = request.with_authorization(value);
        }
        self.gateway.authorize(&request).await
    }
}

impl Default for GatewayHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`GatewayHarness`].
pub struct GatewayHarnessBuilder {
    public_paths: Vec<String>,
    policy: Option<RbacPolicy>,
    failure_mode: RevocationFailureMode,
    revocation_timeout: Duration,
    store_override: Option<Arc<dyn RevocationStore>>,
    revocation: bool,
    client_limit: Option<RateLimitConfig>,
}

impl Default for GatewayHarnessBuilder {
    fn default() -> Self {
        Self {
            public_paths: vec!["/health".to_string(), "/public/*".to_string()],
            policy: Some(RbacPolicy::default()),
            failure_mode: RevocationFailureMode::FailClosed,
            revocation_timeout: Duration::from_millis(100),
            store_override: None,
            revocation: true,
            client_limit: None,
        }
    }
}

impl GatewayHarnessBuilder {
    /// Replaces the public path patterns.
    pub fn public_paths(mut self, paths: &[&str]) -> Self {
        self.public_paths = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Sets the enrichment policy.
    pub fn policy(mut self, policy: RbacPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Disables role enrichment.
    pub fn without_policy(mut self) -> Self {
        self.policy = None;
        self
    }

    /// Sets the behavior on store failure.
    pub fn failure_mode(mut self, mode: RevocationFailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Sets the per-lookup timeout.
    pub fn revocation_timeout(mut self, timeout: Duration) -> Self {
        self.revocation_timeout = timeout;
        self
    }

    /// Uses `store` instead of the in-memory store.
    pub fn revocation_store(mut self, store: Arc<dyn RevocationStore>) -> Self {
        self.store_override = Some(store);
        self
    }

    /// Disables revocation checks.
    pub fn without_revocation(mut self) -> Self {
        self.revocation = false;
        self
    }

    /// Enables client throttling.
    pub fn client_limit(mut self, config: RateLimitConfig) -> Self {
        self.client_limit = Some(config);
        self
    }

    /// Builds the harness.
    pub fn build(self) -> GatewayHarness {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(InMemoryRevocationStore::with_clock(clock.clone()));

        let mut builder = AuthGateway::builder(test_validator())
            .public_paths(PublicPaths::new(&self.public_paths))
            .failure_mode(self.failure_mode)
            .revocation_timeout(self.revocation_timeout);

        if self.revocation {
            let active: Arc<dyn RevocationStore> = match self.store_override {
                Some(custom) => custom,
                None => store.clone(),
            };
            builder = builder.revocation_store(active);
        }
        if let Some(policy) = self.policy {
            builder = builder.policy(policy);
        }
        let client_limiter = self.client_limit.map(|config| {
            Arc::new(InMemoryRateLimiter::with_clock(config, clock.clone()))
        });
        if let Some(limiter) = &client_limiter {
            builder = builder.client_limiter(limiter.clone());
        }

        GatewayHarness {
            clock,
            store,
            client_limiter,
            gateway: builder.build(),
        }
    }
}

// =============================================================================
// TestApp
// =============================================================================

/// A parsed HTTP response.
#[derive(Debug)]
pub struct TestResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// JSON body, or `Null` when empty.
    pub body: Value,
}

impl TestResponse {
    /// Returns `error.code` from an error body.
    pub fn error_code(&self) -> Option<&str> {
        self.body.pointer("/error/code").and_then(Value::as_str)
    }

    /// Returns `error.message` from an error body.
    pub fn error_message(&self) -> Option<&str> {
        self.body.pointer("/error/message").and_then(Value::as_str)
    }
}

/// The full API router served in-process.
pub struct TestApp {
    /// Shared application state.
    pub state: AppState,
    router: Router,
    client: Option<SocketAddr>,
}

impl TestApp {
    /// Creates an app from [`test_auth_config`].
    pub fn new() -> Self {
        Self::from_config(test_auth_config())
    }

    /// Creates an app from `config`.
    pub fn from_config(config: AuthConfig) -> Self {
        let state = AppState::from_config(&config).expect("valid test configuration");
        Self::from_state(state)
    }

    /// Creates an app around prepared state.
    pub fn from_state(state: AppState) -> Self {
        let router = ApiServer::new(state.clone(), ServerConfig::default()).router();
        Self {
            state,
            router,
            client: None,
        }
    }

    /// Attaches a peer address to every request.
    pub fn with_client(mut self, addr: SocketAddr) -> Self {
        self.client = Some(addr);
        self
    }

    /// Sends a request through the router.
    pub async fn send(&self, mut request: Request<Body>) -> TestResponse {
        if let Some(addr) = self.client {
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collected")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON response body")
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Sends a GET with an optional bearer token.
    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, token, None)).await
    }

    /// Sends a POST with an optional bearer token and JSON body.
    pub async fn post(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        self.send(request(Method::POST, uri, token, body)).await
    }

    /// Registers an account.
    pub async fn register(&self, email: &str, password: &str) -> TestResponse {
        let body = serde_json::json!({ "email": email, "password": password });
        self.post("/api/v1/auth/register", None, Some(body)).await
    }

    /// Attempts a login.
    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        let body = serde_json::json!({ "email": email, "password": password });
        self.post("/api/v1/auth/login", None, Some(body)).await
    }

    /// Registers an account, logs in and returns the access token.
    pub async fn signed_in(&self, email: &str, password: &str) -> String {
        let registered = self.register(email, password).await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);

        let response = self.login(email, password).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["access_token"]
            .as_str()
            .expect("access_token in body")
            .to_string()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(token));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("valid request")
}
