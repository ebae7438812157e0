// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API handlers for all endpoints.
//!
//! - [`health`]: liveness
//! - [`auth`]: register, login, current identity and logout
//! - [`admin`]: token and session revocation

pub mod admin;
pub mod auth;
pub mod health;

pub use admin::*;
pub use auth::*;
pub use health::*;
