// ABOUTME: Security module organization for token storage, provenance, and headers
// ABOUTME: Groups the building blocks consumed by the CSRF guard and issuance service
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Security building blocks
//!
//! [`token_store::TokenStore`] owns the one-time-token registry,
//! [`origin::OriginPolicy`] decides request provenance, and the remaining
//! modules cover cookie parsing, response hardening headers, and
//! security-event logging for monitoring.

/// Cookie header parsing helpers
pub mod cookies;
/// Security event logging for rejected requests
pub mod events;
/// Response security headers (CSP, frame options, HSTS)
pub mod headers;
/// Origin/Referer provenance validation and CORS profiles
pub mod origin;
/// One-time CSRF token registry
pub mod token_store;

pub use origin::OriginPolicy;
pub use token_store::{TokenRejection, TokenStore};
