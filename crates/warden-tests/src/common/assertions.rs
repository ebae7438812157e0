// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Assertion helpers.

use axum::http::StatusCode;
use warden_auth::AuthResult;

use super::builders::TestResponse;

/// Asserts an HTTP error response with the given status and code.
#[track_caller]
pub fn assert_error(response: &TestResponse, status: StatusCode, code: &str) {
    assert_eq!(response.status, status, "unexpected body: {}", response.body);
    assert_eq!(response.error_code(), Some(code), "unexpected body: {}", response.body);
}

/// Asserts that `result` failed with the given engine error code.
#[track_caller]
pub fn assert_auth_error<T: std::fmt::Debug>(result: AuthResult<T>, code: &str) {
    match result {
        Ok(value) => panic!("expected {code}, got Ok({value:?})"),
        Err(err) => assert_eq!(err.error_code(), code, "unexpected error: {err}"),
    }
}

/// Asserts that the `Retry-After` header carries `seconds`.
#[track_caller]
pub fn assert_retry_after(response: &TestResponse, seconds: u64) {
    let value = response
        .headers
        .get(axum::http::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok());
    assert_eq!(value, Some(seconds.to_string().as_str()));
}
