// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Custom extractors for API handlers.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use warden_auth::{AuthError, IdentityContext};

use crate::error::ApiError;

// =============================================================================
// Identity Extractor
// =============================================================================

/// Extractor for authenticated requests.
///
/// Reads the identity the auth middleware stored in the request extensions.
/// Anonymous callers are refused with 401.
///
/// ```rust,ignore
/// async fn handler(Identity(identity): Identity) -> impl IntoResponse {
///     format!("Hello, {}", identity.subject_id())
/// }
/// ```
pub struct Identity(pub Arc<IdentityContext>);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<IdentityContext>>()
            .cloned()
            .filter(|identity| identity.is_authenticated())
            .map(Identity)
            .ok_or_else(|| ApiError::from(AuthError::Unauthenticated))
    }
}

// =============================================================================
// Validated JSON Extractor
// =============================================================================

/// Extractor for JSON payloads that reports malformed input as 400.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {e}")))?;

        Ok(ValidatedJson(value))
    }
}
