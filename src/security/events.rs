// ABOUTME: Security event logging for rejected requests and fallback activations
// ABOUTME: Emits structured events with client identity for security monitoring
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Security Event Module
//!
//! Every 403/429/405 rejection is recorded here with the client identity and
//! the specific reason, for security monitoring. This server-side detail is
//! deliberately richer than the terse message returned to the client.

use serde::Serialize;

/// Types of security events tracked by the system
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    /// CSRF validation rejected a mutating request
    CsrfRejected,
    /// A client exhausted its fixed-window budget
    RateLimited,
    /// Origin/Referer provenance check failed
    OriginRejected,
    /// Method not permitted for the resolved route profile
    MethodNotAllowed,
    /// Bearer authentication failed on an issuance endpoint
    AuthFailed,
    /// Production request carried an origin absent from the allow-list
    /// (detection signal only, the request was not blocked)
    UnknownCrossOrigin,
    /// Upstream identifier issuance failed; local generation used instead
    UpstreamFallback,
}

/// Severity levels for security events
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Expected operational event
    Info,
    /// Suspicious or repeated-failure event
    Warning,
}

impl SecurityEventKind {
    /// Default severity for this event kind
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::UnknownCrossOrigin | Self::UpstreamFallback => Severity::Info,
            Self::CsrfRejected
            | Self::RateLimited
            | Self::OriginRejected
            | Self::MethodNotAllowed
            | Self::AuthFailed => Severity::Warning,
        }
    }
}

/// Record a security event with the client identity and reason.
///
/// Events go to the `security` tracing target so operators can route them
/// to a dedicated sink independent of application logs.
pub fn record(kind: SecurityEventKind, client: &str, detail: &str) {
    match kind.severity() {
        Severity::Warning => tracing::warn!(
            target: "security",
            event = ?kind,
            client = %client,
            detail = %detail,
            "security event"
        ),
        Severity::Info => tracing::info!(
            target: "security",
            event = ?kind,
            client = %client,
            detail = %detail,
            "security event"
        ),
    }
}
