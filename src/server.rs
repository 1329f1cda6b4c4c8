// ABOUTME: Server resource ownership, router assembly, and background maintenance
// ABOUTME: Constructs the shared stores, limiters, and services injected into handlers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Server wiring
//!
//! [`ServerResources`] is the one explicit owner of every piece of shared
//! mutable state (token registry, rate-limit counters). It is constructed
//! once at process start and injected into handlers and middleware as axum
//! state; nothing in this crate lives in module-level globals. Lifecycle is
//! process start to process shutdown.

use crate::config::ServerConfig;
use crate::crypto::{SecureRandom, TokenCodec};
use crate::errors::AppResult;
use crate::issuance::{IdentifierService, UpstreamUuidClient, UuidSource};
use crate::middleware::cors::cors_middleware;
use crate::middleware::csrf::csrf_middleware;
use crate::middleware::CsrfGuard;
use crate::rate_limiting::{FixedWindowConfig, FixedWindowRateLimiter};
use crate::routes::{CsrfRoutes, HealthRoutes, UuidRoutes};
use crate::security::headers::SecurityHeaders;
use crate::security::{OriginPolicy, TokenStore};
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

/// How often the background task sweeps expired tokens and stale counters
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared resources injected into every handler and middleware
pub struct ServerResources {
    /// Runtime configuration
    pub config: ServerConfig,
    /// One-time CSRF token registry
    pub token_store: Arc<TokenStore>,
    /// Budget for token/UUID issuance requests
    pub issuance_limiter: Arc<FixedWindowRateLimiter>,
    /// Budget for CSRF validation attempts, independent of issuance so one
    /// attack cannot starve the other concern
    pub validation_limiter: Arc<FixedWindowRateLimiter>,
    /// Origin/Referer provenance policy
    pub origin_policy: Arc<OriginPolicy>,
    /// CSRF validation guard
    pub csrf_guard: CsrfGuard,
    /// Identifier issuance service
    pub identifier_service: IdentifierService,
    /// Response hardening headers
    pub security_headers: SecurityHeaders,
}

impl ServerResources {
    /// Construct all shared state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream HTTP client cannot be built.
    pub fn new(config: ServerConfig) -> AppResult<Self> {
        let token_store = Arc::new(TokenStore::new(config.csrf.token_lifetime_secs));

        let window = config.rate_limits.window();
        let issuance_limiter = Arc::new(FixedWindowRateLimiter::new(FixedWindowConfig {
            max_requests: config.rate_limits.issuance_max,
            window,
            cleanup_threshold: config.rate_limits.cleanup_threshold,
            stale_after: Duration::from_secs(config.rate_limits.stale_entry_timeout_secs),
        }));
        let validation_limiter = Arc::new(FixedWindowRateLimiter::new(FixedWindowConfig {
            max_requests: config.rate_limits.validation_max,
            window,
            cleanup_threshold: config.rate_limits.cleanup_threshold,
            stale_after: Duration::from_secs(config.rate_limits.stale_entry_timeout_secs),
        }));

        let origin_policy = Arc::new(OriginPolicy::new(config.environment, &config.cors));

        let csrf_guard = CsrfGuard::new(
            Arc::clone(&token_store),
            Arc::clone(&validation_limiter),
            Arc::clone(&origin_policy),
            config.csrf.clone(),
        );

        let primary_uuid_source: Option<Arc<dyn UuidSource>> =
            UpstreamUuidClient::from_config(&config.upstream_uuid)?
                .map(|client| Arc::new(client) as Arc<dyn UuidSource>);
        if primary_uuid_source.is_some() {
            info!("upstream UUID issuance enabled");
        } else {
            info!("upstream UUID issuance not configured, local generation only");
        }

        let identifier_service = IdentifierService::new(
            TokenCodec::new(SecureRandom::new()),
            Arc::clone(&token_store),
            Arc::clone(&issuance_limiter),
            primary_uuid_source,
            config.csrf.clone(),
            config.environment,
        );

        let security_headers = SecurityHeaders::from_environment(config.environment);

        Ok(Self {
            config,
            token_store,
            issuance_limiter,
            validation_limiter,
            origin_policy,
            csrf_guard,
            identifier_service,
            security_headers,
        })
    }
}

/// Assemble the full application router with all middleware layers
#[must_use]
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(HealthRoutes::router())
        .merge(CsrfRoutes::router())
        .merge(UuidRoutes::router())
        // innermost: CSRF validation for mutating, non-exempt requests
        .layer(middleware::from_fn_with_state(
            Arc::clone(&resources),
            csrf_middleware,
        ))
        // CORS runs outside CSRF so preflights and method rejections
        // short-circuit before any token state is touched
        .layer(middleware::from_fn_with_state(
            Arc::clone(&resources),
            cors_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&resources),
            security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(resources)
}

/// Apply response hardening headers to every response
async fn security_headers_middleware(
    State(resources): State<Arc<ServerResources>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    resources.security_headers.apply(response.headers_mut());
    response
}

/// Spawn the periodic maintenance task: expired-token sweep plus
/// stale rate-limit counter eviction.
///
/// Runs independently of request handling; the store and limiter operations
/// it calls are safe to interleave with in-flight requests.
pub fn spawn_maintenance(resources: Arc<ServerResources>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            resources.token_store.sweep().await;
            resources.issuance_limiter.purge_stale();
            resources.validation_limiter.purge_stale();
        }
    })
}

/// Bind and serve until shutdown.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn run(resources: Arc<ServerResources>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], resources.config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        %addr,
        environment = %resources.config.environment,
        "forgeguard listening"
    );

    axum::serve(
        listener,
        router(resources).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
    }
    info!("shutdown signal received, draining");
}
