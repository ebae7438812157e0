// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Administrative revocation handlers.
//!
//! Mounted behind an [`RbacLayer`](crate::middleware::RbacLayer) requiring
//! `delete:Auth.Session`.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extractors::Identity;
use crate::state::AppState;

/// Revocation acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct RevocationResponse {
    /// `token` or `sessions`.
    pub revoked: String,
    /// The revoked `jti` or subject id.
    pub target: String,
    /// Cutoff applied to sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<DateTime<Utc>>,
}

/// POST /api/v1/admin/tokens/{jti}/revoke
pub async fn revoke_token(
    State(state): State<AppState>,
    Identity(admin): Identity,
    Path(jti): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let jti = jti.trim();
    if jti.is_empty() {
        return Err(ApiError::bad_request("Token id is required"));
    }
    let Some(store) = state.gateway.revocation_store() else {
        return Err(ApiError::service_unavailable("Revocation is disabled"));
    };

    store.revoke_token(jti).await?;
    tracing::info!(admin = admin.subject_id(), "Token revoked by administrator");

    Ok(Json(RevocationResponse {
        revoked: "token".to_string(),
        target: jti.to_string(),
        before: None,
    }))
}

/// POST /api/v1/admin/users/{subject_id}/revoke-sessions
///
/// Invalidates every token issued to the subject up to now.
pub async fn revoke_sessions(
    State(state): State<AppState>,
    Identity(admin): Identity,
    Path(subject_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let subject_id = subject_id.trim();
    if subject_id.is_empty() {
        return Err(ApiError::bad_request("Subject id is required"));
    }
    let Some(store) = state.gateway.revocation_store() else {
        return Err(ApiError::service_unavailable("Revocation is disabled"));
    };

    let before = Utc::now();
    store.revoke_all_user_tokens(subject_id, before).await?;
    tracing::info!(
        admin = admin.subject_id(),
        subject = %subject_id,
        "Sessions revoked by administrator"
    );

    Ok(Json(RevocationResponse {
        revoked: "sessions".to_string(),
        target: subject_id.to_string(),
        before: Some(before),
    }))
}
