// ABOUTME: CSRF validation middleware for state-changing HTTP requests
// ABOUTME: Enforces the double-submit cookie pattern with one-time token consumption
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! CSRF guard
//!
//! Per-request flow for mutating methods: validation rate limit, cookie and
//! header token extraction, constant-time byte equality of the pair (the
//! double-submit check happens BEFORE the store is consulted, so a
//! mismatched pair never touches token state), one-time consumption in the
//! [`TokenStore`], then origin/referer provenance. Safe methods bypass the
//! guard entirely; they must not mutate state, per the contract this
//! subsystem assumes of its caller.
//!
//! Token consumption is one-time: a client must request a fresh token
//! before each mutating call. If a request fails for unrelated reasons
//! after its token was consumed, the client re-issues before retrying.

use crate::config::CsrfConfig;
use crate::errors::{AppError, AppResult};
use crate::rate_limiting::FixedWindowRateLimiter;
use crate::security::cookies::get_cookie_value;
use crate::security::events::{self, SecurityEventKind};
use crate::security::origin::{is_mutating, OriginPolicy};
use crate::security::token_store::{TokenRejection, TokenStore};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// CSRF validation guard for state-changing requests
pub struct CsrfGuard {
    token_store: Arc<TokenStore>,
    validation_limiter: Arc<FixedWindowRateLimiter>,
    origin_policy: Arc<OriginPolicy>,
    config: CsrfConfig,
}

impl CsrfGuard {
    /// Create a guard over the shared store, limiter, and origin policy
    #[must_use]
    pub const fn new(
        token_store: Arc<TokenStore>,
        validation_limiter: Arc<FixedWindowRateLimiter>,
        origin_policy: Arc<OriginPolicy>,
        config: CsrfConfig,
    ) -> Self {
        Self {
            token_store,
            validation_limiter,
            origin_policy,
            config,
        }
    }

    /// Check if a request method requires CSRF validation
    #[must_use]
    pub fn requires_validation(method: &Method) -> bool {
        is_mutating(method)
    }

    /// Check if a path is exempt from CSRF validation (issuance and health
    /// endpoints must stay reachable without a token)
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        self.config
            .exempt_paths
            .iter()
            .any(|exempt| path.starts_with(exempt))
    }

    /// Validate a request against the full CSRF protocol.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as an [`AppError`]:
    /// `RateLimited` (429), `TokenMissing`/`TokenMismatch`/`TokenInvalid`/
    /// `TokenExpired`/`TokenAlreadyUsed`/`OriginRejected` (403). Every
    /// rejection is recorded with the client identity for monitoring.
    pub async fn validate_request(
        &self,
        method: &Method,
        headers: &HeaderMap,
        client: &str,
    ) -> AppResult<()> {
        // Safe methods (GET, HEAD, OPTIONS) bypass all CSRF checks
        if !Self::requires_validation(method) {
            return Ok(());
        }

        let status = self.validation_limiter.check(client);
        if status.is_limited {
            events::record(
                SecurityEventKind::RateLimited,
                client,
                "csrf validation budget exhausted",
            );
            return Err(AppError::rate_limited(status.limit, status.retry_after_secs));
        }

        let cookie_token = get_cookie_value(headers, &self.config.cookie_name);
        let header_token = headers
            .get(self.config.header_name.as_str())
            .and_then(|h| h.to_str().ok())
            .map(str::to_owned);

        let (cookie_token, header_token) = match (cookie_token, header_token) {
            (Some(cookie), Some(header)) => (cookie, header),
            (cookie, _) => {
                let which = if cookie.is_none() { "cookie" } else { "header" };
                events::record(
                    SecurityEventKind::CsrfRejected,
                    client,
                    &format!("{which} token missing on {method} request"),
                );
                return Err(AppError::token_missing(format!(
                    "{which} token absent from mutating request"
                )));
            }
        };

        // Double-submit: the pair must be byte-equal before the store is
        // even consulted. Constant-time comparison resists timing probes.
        if !bool::from(cookie_token.as_bytes().ct_eq(header_token.as_bytes())) {
            events::record(
                SecurityEventKind::CsrfRejected,
                client,
                "cookie and header token mismatch",
            );
            return Err(AppError::token_mismatch());
        }

        if let Err(rejection) = self.token_store.validate_and_consume(&header_token).await {
            events::record(
                SecurityEventKind::CsrfRejected,
                client,
                &format!("token rejected: {rejection:?}"),
            );
            return Err(match rejection {
                TokenRejection::NotFound => AppError::token_invalid(),
                TokenRejection::Expired => AppError::token_expired(),
                TokenRejection::AlreadyUsed => AppError::token_already_used(),
            });
        }

        let origin = headers.get("origin").and_then(|h| h.to_str().ok());
        let referer = headers.get("referer").and_then(|h| h.to_str().ok());
        if let Err(err) = self
            .origin_policy
            .validate_origin_for_mutation(method, origin, referer)
        {
            events::record(SecurityEventKind::OriginRejected, client, &err.message);
            return Err(err);
        }

        tracing::debug!(client = %client, method = %method, "CSRF validation passed");
        Ok(())
    }
}

/// Axum layer applying the CSRF guard to every non-exempt request
///
/// # Errors
///
/// Propagates the guard's rejection, rendered by the `AppError` response
/// mapping.
pub async fn csrf_middleware(
    State(resources): State<Arc<crate::server::ServerResources>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path();
    if resources.csrf_guard.is_exempt(path) {
        return Ok(next.run(request).await);
    }

    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = crate::middleware::extract_client_ip(request.headers(), remote);

    resources
        .csrf_guard
        .validate_request(request.method(), request.headers(), &client)
        .await?;

    Ok(next.run(request).await)
}
