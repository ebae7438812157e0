// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! HTTP rendering of engine and handler failures.
//!
//! Every error renders as `{"error": {"code", "message"}}` with the status
//! code taken from the engine's error mapping.

use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_auth::AuthError;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

const HIDDEN: &str = "Internal server error";

/// Failure surfaced by a handler, middleware or the server itself.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The engine refused or failed the request.
    #[error("{source}")]
    Auth {
        /// The engine error.
        source: AuthError,
        /// Seconds until a throttled caller may retry.
        retry_after: Option<u64>,
    },

    /// The request body or path is unusable.
    #[error("{0}")]
    BadRequest(String),

    /// A feature the route depends on is switched off.
    #[error("{0}")]
    Unavailable(String),

    /// The listener could not be opened.
    #[error("failed to bind {addr}")]
    Bind {
        /// Configured listen address.
        addr: SocketAddr,
        /// Underlying bind failure.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop stopped with an I/O error.
    #[error("server terminated")]
    Serve(#[source] std::io::Error),
}

impl ApiError {
    /// Creates a 400 error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Creates a 503 error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Attaches a `Retry-After` hint. Only rate-limit errors carry it.
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        if let Self::Auth {
            source: AuthError::RateLimited,
            retry_after,
        } = &mut self
        {
            *retry_after = Some(seconds);
        }
        self
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth { source, .. } => StatusCode::from_u16(source.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Bind { .. } | Self::Serve(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Auth { source, .. } => source.error_code(),
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Bind { .. } | Self::Serve(_) => "INTERNAL_ERROR",
        }
    }

    /// Message shown to callers. Server-side failures never expose details.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth {
                source: AuthError::Backend(_) | AuthError::InvalidConfig(_) | AuthError::Internal(_),
                ..
            }
            | Self::Bind { .. }
            | Self::Serve(_) => HIDDEN.to_string(),
            other => other.to_string(),
        }
    }

    /// The engine error, if this wraps one.
    pub fn auth_error(&self) -> Option<&AuthError> {
        match self {
            Self::Auth { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(source: AuthError) -> Self {
        Self::Auth {
            source,
            retry_after: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code, %status, "Request failed");
        } else {
            tracing::debug!(code, %status, "Request refused");
        }

        let retry_after = match &self {
            Self::Auth { retry_after, .. } => *retry_after,
            _ => None,
        };
        let body = ErrorResponseBody {
            error: ErrorDetails {
                code: code.to_string(),
                message: self.user_message(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

/// Wire shape of an error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseBody {
    /// Error details.
    pub error: ErrorDetails,
}

/// `code` and `message` of an error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}
