// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Middleware implementations for the API server.
//!
//! - [`AuthMiddleware`]: bearer authentication through the gateway
//! - [`RbacLayer`]: per-route permission checks

mod auth;
mod rbac;

pub use auth::{AuthLayer, AuthMiddleware};
pub use rbac::{RbacLayer, RbacMiddleware};
