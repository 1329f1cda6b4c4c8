// ABOUTME: HTTP middleware organization for request validation layers
// ABOUTME: Groups CSRF guarding, CORS application, and client identity extraction
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request middleware
//!
//! Layers applied around the route handlers: CSRF validation for mutating
//! requests, profile-driven CORS, and client identity extraction used for
//! rate-limit keying and security logging.

/// Client IP extraction from forwarded headers
pub mod client_ip;
/// Profile-driven CORS decisions applied as a layer
pub mod cors;
/// CSRF double-submit validation for state-changing requests
pub mod csrf;

pub use client_ip::extract_client_ip;
pub use csrf::CsrfGuard;
