// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # warden-api
//!
//! HTTP adapter for the Warden authorization engine.
//!
//! Every request passes through [`middleware::AuthLayer`], which runs the
//! [`warden_auth::AuthGateway`] and stores the resulting identity in the
//! request extensions. Handlers read it with the [`extractors::Identity`]
//! extractor; admin routes add an [`middleware::RbacLayer`] check on top.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorDetails, ErrorResponseBody};
pub use server::ApiServer;
pub use state::{AppState, AppStateBuilder, API_PUBLIC_PATHS};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
