// ABOUTME: Route module organization for the issuance and monitoring HTTP endpoints
// ABOUTME: Each domain module contains route definitions and thin handlers over the service layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP routes
//!
//! Thin handlers that delegate to [`crate::issuance::IdentifierService`];
//! all policy lives in the service and middleware layers.

/// CSRF token issuance routes
pub mod csrf;
/// Health check and system status routes
pub mod health;
/// UUID issuance routes (bearer-authenticated)
pub mod uuid;

pub use csrf::CsrfRoutes;
pub use health::HealthRoutes;
pub use uuid::UuidRoutes;
