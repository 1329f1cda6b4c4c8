// ABOUTME: Upstream UUID issuance client with bounded timeout and single 429 retry
// ABOUTME: Primary stage of the network-then-local issuance strategy
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! Upstream UUID source
//!
//! The trusted centralized issuance endpoint is preferred over local
//! generation so identifier issuance can be audited in one place. Every
//! failure mode here (timeout, non-2xx, malformed body) resolves to `None`
//! and the caller falls back locally; the upstream path never surfaces an
//! error to the issuance caller.
//!
//! A 429 from the upstream gets exactly one bounded delay-and-retry before
//! giving up, so transient load does not needlessly discard the preferred
//! path. The same policy applies to every issuance call site.

use crate::config::UpstreamUuidConfig;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// A source that may produce a UUID, or decline.
///
/// `None` means "this stage is unavailable"; the caller proceeds to the
/// fallback stage. Tests implement this trait to inject failures.
#[async_trait]
pub trait UuidSource: Send + Sync {
    /// Attempt to produce one UUID
    async fn try_issue(&self) -> Option<String>;
}

/// Response body of the upstream issuance endpoint
#[derive(Debug, Deserialize)]
struct UpstreamUuidResponse {
    uuid: String,
}

/// HTTP client for the trusted UUID issuance endpoint
pub struct UpstreamUuidClient {
    client: reqwest::Client,
    url: String,
    bearer_token: String,
    retry_delay: Duration,
}

impl UpstreamUuidClient {
    /// Build a client when the upstream path is configured.
    ///
    /// Returns `Ok(None)` when URL or bearer token are absent (local-only
    /// deployment).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &UpstreamUuidConfig) -> AppResult<Option<Self>> {
        let (Some(url), Some(bearer_token)) = (&config.url, &config.bearer_token) else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::internal("failed to build upstream HTTP client").with_source(e))?;

        Ok(Some(Self {
            client,
            url: url.clone(),
            bearer_token: bearer_token.clone(),
            retry_delay: config.retry_delay(),
        }))
    }

    async fn request_once(&self) -> Result<String, RequestFailure> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "upstream UUID request failed");
                RequestFailure::Unavailable
            })?;

        match response.status() {
            status if status.is_success() => response
                .json::<UpstreamUuidResponse>()
                .await
                .map(|body| body.uuid)
                .map_err(|e| {
                    tracing::warn!(error = %e, "upstream UUID response body malformed");
                    RequestFailure::Unavailable
                }),
            StatusCode::TOO_MANY_REQUESTS => Err(RequestFailure::Throttled),
            status => {
                tracing::warn!(status = %status, "upstream UUID endpoint returned error");
                Err(RequestFailure::Unavailable)
            }
        }
    }
}

enum RequestFailure {
    /// Upstream said 429; worth one retry
    Throttled,
    /// Anything else; fall back immediately
    Unavailable,
}

#[async_trait]
impl UuidSource for UpstreamUuidClient {
    async fn try_issue(&self) -> Option<String> {
        match self.request_once().await {
            Ok(uuid) => return Some(uuid),
            Err(RequestFailure::Unavailable) => return None,
            Err(RequestFailure::Throttled) => {
                tracing::debug!(
                    delay_ms = self.retry_delay.as_millis() as u64,
                    "upstream throttled, retrying once"
                );
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        match self.request_once().await {
            Ok(uuid) => Some(uuid),
            Err(_) => {
                tracing::warn!("upstream still unavailable after throttle retry");
                None
            }
        }
    }
}
