// ABOUTME: Secure identifier issuance module organization
// ABOUTME: Groups the issuance service and the upstream UUID source strategy
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secure identifier issuance
//!
//! [`service::IdentifierService`] issues CSRF tokens and v4 UUIDs. UUID
//! issuance prefers the trusted upstream endpoint and falls back to local
//! generation; the two stages are explicit so tests can inject failures at
//! the primary stage deterministically.

/// Issuance service for CSRF tokens and UUIDs
pub mod service;
/// Upstream UUID source and the primary/fallback strategy seam
pub mod upstream;

pub use service::{IdentifierService, IssuedCsrfToken, MAX_UUID_BATCH};
pub use upstream::{UpstreamUuidClient, UuidSource};
