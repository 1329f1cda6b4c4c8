// ABOUTME: Unified error handling for the forgery-protection and issuance subsystem
// ABOUTME: Defines error codes, HTTP status mapping, and response formatting
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Unified Error Handling System
//!
//! Centralized error types for the service. Every error carries a stable
//! [`ErrorCode`] which maps to an HTTP status and to a terse client-facing
//! message. The detailed, security-relevant context is logged server-side
//! and never leaked to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication (1000-1999)
    /// Authorization header missing entirely
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired,
    /// Authorization credentials present but invalid
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid,

    // Rate limiting (2000-2999)
    /// Fixed-window budget for this client is exhausted
    #[serde(rename = "RATE_LIMITED")]
    RateLimited,

    // CSRF token lifecycle (3000-3999)
    /// Cookie token or header token absent from a mutating request
    #[serde(rename = "CSRF_TOKEN_MISSING")]
    TokenMissing,
    /// Cookie token and header token are not byte-equal
    #[serde(rename = "CSRF_TOKEN_MISMATCH")]
    TokenMismatch,
    /// Token is not known to the store
    #[serde(rename = "CSRF_TOKEN_INVALID")]
    TokenInvalid,
    /// Token outlived the configured lifetime
    #[serde(rename = "CSRF_TOKEN_EXPIRED")]
    TokenExpired,
    /// Token was already consumed once
    #[serde(rename = "CSRF_TOKEN_ALREADY_USED")]
    TokenAlreadyUsed,

    // Provenance (4000-4999)
    /// Origin/Referer failed the environment allow-list
    #[serde(rename = "ORIGIN_REJECTED")]
    OriginRejected,
    /// HTTP method not permitted for the resolved route profile
    #[serde(rename = "METHOD_NOT_ALLOWED")]
    MethodNotAllowed,

    // Validation (5000-5999)
    /// Request payload failed validation
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,

    // Issuance internals (9000-9999)
    /// Upstream issuance endpoint failed; triggers local fallback, never
    /// surfaced to UUID-issuance callers as an error
    #[serde(rename = "UPSTREAM_ISSUANCE_FAILURE")]
    UpstreamIssuance,
    /// The OS cryptographic RNG is unavailable; the service fails closed
    #[serde(rename = "RANDOM_SOURCE_UNAVAILABLE")]
    RandomUnavailable,
    /// Configuration error encountered
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError,
    /// An internal server error occurred
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::AuthRequired | Self::AuthInvalid => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::TokenMissing
            | Self::TokenMismatch
            | Self::TokenInvalid
            | Self::TokenExpired
            | Self::TokenAlreadyUsed
            | Self::OriginRejected => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::UpstreamIssuance
            | Self::RandomUnavailable
            | Self::ConfigError
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Terse message returned to clients.
    ///
    /// Deliberately says no more than a legitimate client needs for its
    /// retry logic; the specific failing check is logged server-side only.
    #[must_use]
    pub const fn client_message(self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication required",
            Self::AuthInvalid => "Invalid authentication credentials",
            Self::RateLimited => "Rate limit exceeded. Please slow down your requests",
            Self::TokenMissing => "CSRF token missing",
            Self::TokenMismatch => "CSRF token mismatch",
            Self::TokenInvalid => "Invalid CSRF token",
            Self::TokenExpired => "CSRF token expired",
            Self::TokenAlreadyUsed => "CSRF token already used",
            Self::OriginRejected => "Request origin not allowed",
            Self::MethodNotAllowed => "Method not allowed",
            Self::InvalidInput => "The provided input is invalid",
            Self::UpstreamIssuance => "Identifier issuance failed",
            Self::RandomUnavailable | Self::InternalError => "An internal server error occurred",
            Self::ConfigError => "Configuration error encountered",
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message (server-side detail)
    pub message: String,
    /// Whether the detailed message may appear in the response body.
    /// Off by default; enabled for internal errors outside production.
    pub expose_detail: bool,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            expose_detail: false,
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Permit the detailed message in the response body (development only)
    #[must_use]
    pub fn with_exposed_detail(mut self) -> Self {
        self.expose_detail = true;
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Authentication required (no credentials supplied)
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Missing authorization header")
    }

    /// Invalid authentication
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Rate limit exceeded for a client identity
    #[must_use]
    pub fn rate_limited(limit: u32, retry_after_secs: u64) -> Self {
        Self::new(
            ErrorCode::RateLimited,
            format!("Rate limit of {limit} requests exceeded, retry after {retry_after_secs}s"),
        )
    }

    /// CSRF cookie or header token missing from a mutating request
    pub fn token_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TokenMissing, message)
    }

    /// CSRF cookie and header tokens are not byte-equal
    #[must_use]
    pub fn token_mismatch() -> Self {
        Self::new(
            ErrorCode::TokenMismatch,
            "Header token does not match cookie token",
        )
    }

    /// Token unknown to the store
    #[must_use]
    pub fn token_invalid() -> Self {
        Self::new(ErrorCode::TokenInvalid, "Token not found in store")
    }

    /// Token outlived its configured lifetime
    #[must_use]
    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired, "Token lifetime exceeded")
    }

    /// Token already consumed once
    #[must_use]
    pub fn token_already_used() -> Self {
        Self::new(ErrorCode::TokenAlreadyUsed, "Token was already consumed")
    }

    /// Request provenance failed the origin allow-list
    pub fn origin_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::OriginRejected, message)
    }

    /// HTTP method not permitted
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MethodNotAllowed, message)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Upstream issuance endpoint failure (internal; triggers fallback)
    pub fn upstream_issuance(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamIssuance, message)
    }

    /// The cryptographic RNG is unavailable; fail closed
    pub fn random_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RandomUnavailable, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorResponseDetails,
}

/// Body of an error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Stable error code
    pub code: ErrorCode,
    /// Terse client-safe message
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        let message = if error.expose_detail {
            error.message.clone()
        } else {
            error.code.client_message().to_owned()
        };
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message,
            },
        }
    }
}

impl IntoResponse for AppError {
    /// Render as the standard error body.
    ///
    /// The response message always comes from [`ErrorCode::client_message`];
    /// the detailed `message` field stays on the server side.
    fn into_response(self) -> Response {
        let body = ErrorResponse::from(&self);
        (self.http_status(), Json(body)).into_response()
    }
}
