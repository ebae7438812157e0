// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_auth::{AuthError, IdentityContext};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{Identity, ValidatedJson};
use crate::state::AppState;

// =============================================================================
// Register
// =============================================================================

/// Credentials body shared by register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    /// Account email.
    pub email: String,
    /// Password.
    pub password: String,
}

/// Registration response.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// New subject id.
    pub user_id: String,
    /// Account email.
    pub email: String,
    /// Granted roles.
    pub roles: Vec<String>,
}

/// POST /api/v1/auth/register
///
/// Creates a local account with the registration role.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CredentialsRequest>,
) -> ApiResult<impl IntoResponse> {
    let identity = state
        .identity
        .register(&request.email, &request.password, &state.registration_roles)
        .await?;

    let body = RegisterResponse {
        user_id: identity.subject_id().to_string(),
        email: identity.email().unwrap_or_default().to_string(),
        roles: identity.roles().iter().cloned().collect(),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

// =============================================================================
// Login
// =============================================================================

/// Token response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Compact JWT.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

/// POST /api/v1/auth/login
///
/// Checks credentials under the login limiter and returns a bearer token.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CredentialsRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }
    let Some(issuer) = state.issuer() else {
        return Err(ApiError::service_unavailable("Token issuance is not configured"));
    };

    let identity = match state.login.login(&request.email, &request.password).await {
        Ok(identity) => identity,
        Err(AuthError::RateLimited) => {
            return Err(ApiError::from(AuthError::RateLimited)
                .with_retry_after(state.login_retry_after_secs));
        }
        Err(e) => return Err(e.into()),
    };

    let issued = issuer.issue(&identity)?;
    tracing::info!(subject = identity.subject_id(), "Token issued");

    Ok(Json(TokenResponse {
        access_token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: (issued.expires_at - issued.issued_at).num_seconds(),
        expires_at: issued.expires_at,
    }))
}

// =============================================================================
// Current Identity
// =============================================================================

/// Identity response.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityResponse {
    /// Subject id.
    pub subject_id: String,
    /// Email, if the token carried one.
    pub email: Option<String>,
    /// Roles after enrichment.
    pub roles: Vec<String>,
    /// Effective permissions.
    pub permissions: Vec<String>,
    /// Token id.
    pub token_id: Option<String>,
    /// Issue time.
    pub issued_at: Option<DateTime<Utc>>,
}

impl From<&IdentityContext> for IdentityResponse {
    fn from(identity: &IdentityContext) -> Self {
        Self {
            subject_id: identity.subject_id().to_string(),
            email: identity.email().map(str::to_string),
            roles: identity.roles().iter().cloned().collect(),
            permissions: identity.permissions().iter().map(str::to_string).collect(),
            token_id: identity.token_id().map(str::to_string),
            issued_at: identity.issued_at(),
        }
    }
}

/// GET /api/v1/auth/me
pub async fn current_identity(Identity(identity): Identity) -> impl IntoResponse {
    Json(IdentityResponse::from(identity.as_ref()))
}

// =============================================================================
// Logout
// =============================================================================

/// POST /api/v1/auth/logout
///
/// Revokes the caller's own token until it would have expired.
pub async fn logout(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> ApiResult<StatusCode> {
    let Some(jti) = identity.token_id() else {
        return Err(ApiError::bad_request("Token has no id and cannot be revoked"));
    };
    let Some(store) = state.gateway.revocation_store() else {
        return Err(ApiError::service_unavailable("Revocation is disabled"));
    };

    match token_expiry(&identity) {
        Some(expires_at) => store.revoke_token_until(jti, expires_at).await?,
        None => store.revoke_token(jti).await?,
    }

    tracing::info!(subject = identity.subject_id(), "Logged out");
    Ok(StatusCode::NO_CONTENT)
}

fn token_expiry(identity: &IdentityContext) -> Option<DateTime<Utc>> {
    let exp = identity.metadata().get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry_from_metadata() {
        let identity = IdentityContext::builder("user-1")
            .metadata("exp", serde_json::json!(1_900_000_000))
            .build();
        assert_eq!(token_expiry(&identity).map(|t| t.timestamp()), Some(1_900_000_000));

        let identity = IdentityContext::builder("user-1")
            .metadata("exp", serde_json::json!("soon"))
            .build();
        assert_eq!(token_expiry(&identity), None);
    }

    #[test]
    fn test_identity_response() {
        let identity = IdentityContext::builder("user-1")
            .email("a@example.com")
            .role("viewer")
            .permission("read:*")
            .token_id("jti-1")
            .build();
        let response = IdentityResponse::from(&identity);
        assert_eq!(response.subject_id, "user-1");
        assert_eq!(response.roles, vec!["viewer"]);
        assert_eq!(response.permissions, vec!["read:*"]);
        assert_eq!(response.token_id.as_deref(), Some("jti-1"));
    }
}
