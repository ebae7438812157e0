// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Warden Integration Tests
//!
//! Shared utilities and integration suites for the Warden workspace.
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: secrets, configurations and pre-signed tokens
//!   - `builders`: a gateway harness on a manual clock, and an HTTP app
//!   - `mocks`: failing and slow collaborators for error injection
//!   - `assertions`: error-body helpers
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p warden-tests
//! cargo test -p warden-tests --test integration_gateway
//! cargo test -p warden-tests --test integration_http
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::builders::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir};
}
