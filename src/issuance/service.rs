// ABOUTME: Secure identifier service issuing CSRF tokens and v4 UUIDs with rate limiting
// ABOUTME: Registers CSRF tokens, builds cookie directives, and runs the UUID fallback chain
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Identifier issuance service
//!
//! CSRF tokens are registered in the [`TokenStore`] only after the value is
//! fully produced, so an aborted request can never leave a half-issued
//! token. UUID issuance runs the two-stage strategy: upstream first, with
//! the returned value structurally validated before use (an external value
//! is never trusted blindly, even from the trusted endpoint), then local
//! generation from the OS CSPRNG.

use crate::config::{CsrfConfig, Environment};
use crate::crypto::TokenCodec;
use crate::errors::{AppError, AppResult};
use crate::rate_limiting::FixedWindowRateLimiter;
use crate::security::events::{self, SecurityEventKind};
use crate::security::token_store::TokenStore;
use chrono::Utc;
use std::sync::Arc;

use super::upstream::UuidSource;

/// Upper bound on batch UUID issuance
pub const MAX_UUID_BATCH: usize = 100;

/// A freshly issued CSRF token plus the cookie directive carrying it
#[derive(Debug, Clone)]
pub struct IssuedCsrfToken {
    /// Raw token value for the response body
    pub token: String,
    /// Header the client must echo the token in
    pub header_name: String,
    /// Expiry as epoch milliseconds
    pub expires_at_ms: i64,
    /// Complete `Set-Cookie` directive
    pub set_cookie: String,
}

/// Issues CSRF tokens and secure UUIDs for client consumption
pub struct IdentifierService {
    codec: TokenCodec,
    token_store: Arc<TokenStore>,
    issuance_limiter: Arc<FixedWindowRateLimiter>,
    primary_uuid_source: Option<Arc<dyn UuidSource>>,
    csrf: CsrfConfig,
    environment: Environment,
}

impl IdentifierService {
    /// Create the service over its shared collaborators
    #[must_use]
    pub fn new(
        codec: TokenCodec,
        token_store: Arc<TokenStore>,
        issuance_limiter: Arc<FixedWindowRateLimiter>,
        primary_uuid_source: Option<Arc<dyn UuidSource>>,
        csrf: CsrfConfig,
        environment: Environment,
    ) -> Self {
        Self {
            codec,
            token_store,
            issuance_limiter,
            primary_uuid_source,
            csrf,
            environment,
        }
    }

    /// Issue a CSRF token and its cookie directive.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` when the client's issuance budget is exhausted
    /// or `RandomUnavailable` if the CSPRNG fails (fail closed).
    pub async fn issue_csrf_token(&self, client: &str) -> AppResult<IssuedCsrfToken> {
        self.charge_issuance(client)?;

        let token = self.codec.csrf_token()?;
        // Register only after the value is finalized; an abort before this
        // point leaves no trace in the store.
        self.token_store.issue(&token).await;

        let lifetime_secs = self.csrf.token_lifetime_secs;
        let expires_at_ms = (Utc::now()
            + chrono::Duration::seconds(lifetime_secs.min(i64::MAX as u64) as i64))
        .timestamp_millis();

        tracing::debug!(client = %client, "issued CSRF token");

        Ok(IssuedCsrfToken {
            set_cookie: self.build_set_cookie(&token),
            header_name: self.csrf.header_name.clone(),
            expires_at_ms,
            token,
        })
    }

    /// Issue one UUID, preferring the upstream source.
    ///
    /// Upstream failure is never surfaced: the caller receives a locally
    /// generated UUID instead. Both paths satisfy the v4 structural
    /// invariant.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` or, if the local CSPRNG itself is broken,
    /// `RandomUnavailable`.
    pub async fn issue_uuid(&self, client: &str) -> AppResult<String> {
        self.charge_issuance(client)?;
        self.next_uuid(client).await
    }

    /// Issue `count` independent UUIDs.
    ///
    /// Each member runs the full single-issue strategy, so one member's
    /// upstream failure falls back locally without disturbing the rest of
    /// the batch. The batch counts once against the issuance budget.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a count of zero or above
    /// [`MAX_UUID_BATCH`], `RateLimited`, or `RandomUnavailable`.
    pub async fn issue_uuid_batch(&self, count: usize, client: &str) -> AppResult<Vec<String>> {
        if count == 0 || count > MAX_UUID_BATCH {
            return Err(AppError::invalid_input(format!(
                "batch count must be between 1 and {MAX_UUID_BATCH}"
            )));
        }

        self.charge_issuance(client)?;

        let mut uuids = Vec::with_capacity(count);
        for _ in 0..count {
            uuids.push(self.next_uuid(client).await?);
        }
        Ok(uuids)
    }

    fn charge_issuance(&self, client: &str) -> AppResult<()> {
        let status = self.issuance_limiter.check(client);
        if status.is_limited {
            events::record(
                SecurityEventKind::RateLimited,
                client,
                "identifier issuance budget exhausted",
            );
            return Err(AppError::rate_limited(status.limit, status.retry_after_secs));
        }
        Ok(())
    }

    async fn next_uuid(&self, client: &str) -> AppResult<String> {
        if let Some(primary) = &self.primary_uuid_source {
            match primary.try_issue().await {
                Some(candidate) if TokenCodec::is_valid_uuid(&candidate) => {
                    return Ok(candidate.to_lowercase());
                }
                Some(candidate) => {
                    // Trusted source or not, a malformed value is discarded
                    events::record(
                        SecurityEventKind::UpstreamFallback,
                        client,
                        &format!("upstream returned malformed uuid ({} chars)", candidate.len()),
                    );
                }
                None => {
                    events::record(
                        SecurityEventKind::UpstreamFallback,
                        client,
                        "upstream issuance unavailable",
                    );
                }
            }
        }

        self.codec.uuid_v4()
    }

    fn build_set_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Strict",
            self.csrf.cookie_name, token, self.csrf.token_lifetime_secs
        );
        if self.environment.is_production() {
            cookie.push_str("; Secure");
            if let Some(domain) = &self.csrf.cookie_domain {
                cookie.push_str("; Domain=");
                cookie.push_str(domain);
            }
        }
        cookie
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::crypto::SecureRandom;
    use crate::rate_limiting::FixedWindowConfig;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FailingSource;

    #[async_trait]
    impl UuidSource for FailingSource {
        async fn try_issue(&self) -> Option<String> {
            None
        }
    }

    struct MalformedSource;

    #[async_trait]
    impl UuidSource for MalformedSource {
        async fn try_issue(&self) -> Option<String> {
            Some("not-a-uuid".into())
        }
    }

    struct FixedSource(String);

    #[async_trait]
    impl UuidSource for FixedSource {
        async fn try_issue(&self) -> Option<String> {
            Some(self.0.clone())
        }
    }

    fn service(primary: Option<Arc<dyn UuidSource>>, environment: Environment) -> IdentifierService {
        service_with_limit(primary, environment, 100)
    }

    fn service_with_limit(
        primary: Option<Arc<dyn UuidSource>>,
        environment: Environment,
        issuance_max: u32,
    ) -> IdentifierService {
        IdentifierService::new(
            TokenCodec::new(SecureRandom::new()),
            Arc::new(TokenStore::new(3600)),
            Arc::new(FixedWindowRateLimiter::new(FixedWindowConfig::new(
                issuance_max,
                Duration::from_secs(60),
            ))),
            primary,
            CsrfConfig::default(),
            environment,
        )
    }

    #[tokio::test]
    async fn issued_csrf_token_is_registered_and_cookie_is_strict() {
        let service = service(None, Environment::Development);
        let issued = service.issue_csrf_token("203.0.113.9").await.unwrap();

        assert_eq!(issued.header_name, "x-csrf-token");
        assert!(issued.set_cookie.starts_with("__Host-csrf-token="));
        assert!(issued.set_cookie.contains("HttpOnly"));
        assert!(issued.set_cookie.contains("SameSite=Strict"));
        assert!(issued.set_cookie.contains("Max-Age=3600"));
        // development: no Secure attribute over plain HTTP
        assert!(!issued.set_cookie.contains("Secure"));
        assert!(issued.expires_at_ms > Utc::now().timestamp_millis());
    }

    #[tokio::test]
    async fn production_cookie_carries_secure_and_domain() {
        let csrf = CsrfConfig {
            cookie_domain: Some("example.com".into()),
            ..CsrfConfig::default()
        };
        let service = IdentifierService::new(
            TokenCodec::new(SecureRandom::new()),
            Arc::new(TokenStore::new(3600)),
            Arc::new(FixedWindowRateLimiter::new(FixedWindowConfig::new(
                100,
                Duration::from_secs(60),
            ))),
            None,
            csrf,
            Environment::Production,
        );

        let issued = service.issue_csrf_token("203.0.113.9").await.unwrap();
        assert!(issued.set_cookie.contains("; Secure"));
        assert!(issued.set_cookie.contains("; Domain=example.com"));
    }

    #[tokio::test]
    async fn failing_primary_falls_back_to_local_generation() {
        let service = service(Some(Arc::new(FailingSource)), Environment::Development);
        let uuid = service.issue_uuid("203.0.113.9").await.unwrap();
        assert!(TokenCodec::is_valid_uuid(&uuid));
    }

    #[tokio::test]
    async fn malformed_upstream_value_is_rejected_and_replaced() {
        let service = service(Some(Arc::new(MalformedSource)), Environment::Development);
        let uuid = service.issue_uuid("203.0.113.9").await.unwrap();
        assert_ne!(uuid, "not-a-uuid");
        assert!(TokenCodec::is_valid_uuid(&uuid));
    }

    #[tokio::test]
    async fn healthy_primary_value_is_used_verbatim() {
        let fixed = "f47ac10b-58cc-4372-a567-0e02b2c3d479".to_owned();
        let service = service(
            Some(Arc::new(FixedSource(fixed.clone()))),
            Environment::Development,
        );
        assert_eq!(service.issue_uuid("203.0.113.9").await.unwrap(), fixed);
    }

    #[tokio::test]
    async fn batch_bounds_are_enforced() {
        let service = service(None, Environment::Development);
        assert!(service.issue_uuid_batch(0, "c").await.is_err());
        assert!(service
            .issue_uuid_batch(MAX_UUID_BATCH + 1, "c")
            .await
            .is_err());

        let uuids = service.issue_uuid_batch(10, "c").await.unwrap();
        assert_eq!(uuids.len(), 10);
        assert!(uuids.iter().all(|u| TokenCodec::is_valid_uuid(u)));
    }

    #[tokio::test]
    async fn batch_members_fall_back_individually() {
        let service = service(
            Some(Arc::new(MalformedSource)),
            Environment::Development,
        );
        let uuids = service.issue_uuid_batch(5, "c").await.unwrap();
        assert_eq!(uuids.len(), 5);
        assert!(uuids.iter().all(|u| TokenCodec::is_valid_uuid(u)));
    }

    #[tokio::test]
    async fn exhausted_issuance_budget_yields_rate_limited() {
        let service = service_with_limit(None, Environment::Development, 2);
        assert!(service.issue_csrf_token("c").await.is_ok());
        assert!(service.issue_uuid("c").await.is_ok());

        let err = service.issue_uuid("c").await.unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::RateLimited);
        // a different client still has budget
        assert!(service.issue_uuid("other").await.is_ok());
    }
}
