// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! RBAC (Role-Based Access Control) middleware.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use warden_auth::{Action, AuthError, IdentityContext, RbacPolicy};

use crate::error::ApiError;

// =============================================================================
// RbacLayer
// =============================================================================

/// Required `action` on `domain[.entity]`.
#[derive(Debug, Clone)]
struct Requirement {
    action: Action,
    domain: String,
    entity: Option<String>,
}

/// Layer that checks the request identity against one permission.
///
/// Must run inside an [`AuthLayer`](super::AuthLayer), which supplies the identity.
#[derive(Clone)]
pub struct RbacLayer {
    policy: Arc<RbacPolicy>,
    requirement: Arc<Requirement>,
}

impl RbacLayer {
    /// Creates a layer requiring `action` on `domain[.entity]`.
    pub fn require(
        policy: Arc<RbacPolicy>,
        action: Action,
        domain: impl Into<String>,
        entity: Option<&str>,
    ) -> Self {
        Self {
            policy,
            requirement: Arc::new(Requirement {
                action,
                domain: domain.into(),
                entity: entity.map(str::to_string),
            }),
        }
    }
}

impl<S> Layer<S> for RbacLayer {
    type Service = RbacMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RbacMiddleware {
            inner,
            policy: self.policy.clone(),
            requirement: self.requirement.clone(),
        }
    }
}

// =============================================================================
// RbacMiddleware
// =============================================================================

/// Middleware for RBAC enforcement.
#[derive(Clone)]
pub struct RbacMiddleware<S> {
    inner: S,
    policy: Arc<RbacPolicy>,
    requirement: Arc<Requirement>,
}

impl<S> Service<Request<Body>> for RbacMiddleware<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let policy = self.policy.clone();
        let requirement = self.requirement.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(identity) = req.extensions().get::<Arc<IdentityContext>>().cloned() else {
                tracing::warn!("No identity found, denying access");
                return Ok(ApiError::from(AuthError::Unauthenticated).into_response());
            };

            let outcome = policy.authorize(
                &identity,
                requirement.action,
                &requirement.domain,
                requirement.entity.as_deref(),
            );
            match outcome {
                Ok(()) => inner.call(req).await,
                Err(e) => {
                    tracing::warn!(
                        subject = identity.subject_id(),
                        roles = ?identity.roles(),
                        "Access refused"
                    );
                    Ok(ApiError::from(e).into_response())
                }
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::convert::Infallible;
    use tower::ServiceExt;

    fn layer() -> RbacLayer {
        RbacLayer::require(
            Arc::new(RbacPolicy::default()),
            Action::Delete,
            "Auth",
            Some("Session"),
        )
    }

    async fn call(identity: Option<IdentityContext>) -> StatusCode {
        let service = layer().layer(tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        }));
        let mut req = Request::builder().uri("/admin").body(Body::empty()).unwrap();
        if let Some(identity) = identity {
            req.extensions_mut().insert(Arc::new(identity));
        }
        service.oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_rbac_permission_granted() {
        let identity = IdentityContext::builder("admin-1")
            .permission("delete:Auth")
            .build();
        assert_eq!(call(Some(identity)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rbac_permission_denied() {
        let identity = IdentityContext::builder("viewer-1")
            .permission("read:*")
            .build();
        assert_eq!(call(Some(identity)).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_rbac_anonymous_refused() {
        assert_eq!(call(Some(IdentityContext::anonymous())).await, StatusCode::UNAUTHORIZED);
        assert_eq!(call(None).await, StatusCode::UNAUTHORIZED);
    }
}
