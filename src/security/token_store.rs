// ABOUTME: One-time CSRF token registry with expiry sweep and atomic consumption
// ABOUTME: Owns the token lifecycle: issued, consumed exactly once, or expired
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! CSRF token store
//!
//! In-memory registry mapping issued tokens to issuance metadata. The token
//! lifecycle has exactly one state transition: `Issued -> Consumed` or
//! `Issued -> Expired`, both terminal. `validate_and_consume` is the single
//! atomic check-and-set; two concurrent calls for the same token can never
//! both succeed.
//!
//! In production, consider backing this with Redis or database storage for
//! distributed deployments; the store API is the seam for that swap.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Why a token failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// Token is not in the registry
    NotFound,
    /// Token outlived the configured lifetime; the entry has been evicted
    Expired,
    /// Token was already consumed once
    AlreadyUsed,
}

/// Token issuance metadata (the token itself is the map key)
#[derive(Debug, Clone)]
struct TokenRecord {
    issued_at: DateTime<Utc>,
    consumed: bool,
}

/// One-time token registry with in-memory storage
pub struct TokenStore {
    tokens: RwLock<HashMap<String, TokenRecord>>,
    lifetime: Duration,
}

impl TokenStore {
    /// Create a store whose tokens live for `lifetime` seconds
    #[must_use]
    pub fn new(lifetime_secs: u64) -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            lifetime: Duration::seconds(lifetime_secs.min(i64::MAX as u64) as i64),
        }
    }

    /// Register a freshly issued token.
    ///
    /// A value collision overwrites the previous record; with 256 bits of
    /// entropy per token that event is astronomically unlikely and not
    /// handled specially.
    pub async fn issue(&self, token: &str) {
        self.issue_at(token, Utc::now()).await;
    }

    pub(crate) async fn issue_at(&self, token: &str, now: DateTime<Utc>) {
        let mut tokens = self.tokens.write().await;
        tokens.insert(
            token.to_owned(),
            TokenRecord {
                issued_at: now,
                consumed: false,
            },
        );
    }

    /// Validate a token and mark it consumed, atomically.
    ///
    /// Holds the write lock across the read of the `consumed` flag and the
    /// set, so a concurrent duplicate request observes the consumed state.
    /// An expired entry is evicted on the spot.
    ///
    /// # Errors
    ///
    /// Returns the applicable [`TokenRejection`].
    pub async fn validate_and_consume(&self, token: &str) -> Result<(), TokenRejection> {
        self.validate_and_consume_at(token, Utc::now()).await
    }

    pub(crate) async fn validate_and_consume_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TokenRejection> {
        let mut tokens = self.tokens.write().await;

        let record = tokens.get_mut(token).ok_or(TokenRejection::NotFound)?;

        if now - record.issued_at > self.lifetime {
            tokens.remove(token);
            return Err(TokenRejection::Expired);
        }

        if record.consumed {
            return Err(TokenRejection::AlreadyUsed);
        }

        record.consumed = true;
        debug!("CSRF token consumed");
        Ok(())
    }

    /// Remove every entry past its lifetime, consumed or not.
    ///
    /// Safe to run from a background task while requests are in flight; it
    /// takes the same write lock as `issue`/`validate_and_consume`.
    pub async fn sweep(&self) {
        self.sweep_at(Utc::now()).await;
    }

    pub(crate) async fn sweep_at(&self, now: DateTime<Utc>) {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, record| now - record.issued_at <= self.lifetime);
        let swept = before - tokens.len();
        drop(tokens);
        if swept > 0 {
            info!(swept, "Swept expired CSRF tokens");
        }
    }

    /// Number of registered tokens (consumed entries included until swept)
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }

    /// Whether a token is currently registered, consumed or not
    pub async fn contains(&self, token: &str) -> bool {
        self.tokens.read().await.contains_key(token)
    }
}
