// ABOUTME: Integration tests for fixed-window rate limiting across both budget concerns
// ABOUTME: Verifies window semantics and the independence of issuance and validation limiters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{resources, test_config, CLIENT};
use forgeguard::errors::ErrorCode;
use forgeguard::rate_limiting::{FixedWindowConfig, FixedWindowRateLimiter};
use std::time::Duration;

#[test]
fn window_budget_is_enforced_and_recovers() {
    let limiter = FixedWindowRateLimiter::new(FixedWindowConfig::new(
        3,
        Duration::from_secs(60),
    ));

    assert!(limiter.allow(CLIENT));
    assert!(limiter.allow(CLIENT));
    assert!(limiter.allow(CLIENT));
    assert!(!limiter.allow(CLIENT));

    let status = limiter.check(CLIENT);
    assert!(status.is_limited);
    assert_eq!(status.limit, 3);
    assert_eq!(status.remaining, 0);
    assert!(status.retry_after_secs > 0 && status.retry_after_secs <= 60);
}

#[tokio::test]
async fn issuance_exhaustion_does_not_starve_validation() {
    let mut config = test_config();
    config.rate_limits.issuance_max = 1;
    let resources = resources(config);

    // exhaust issuance
    let issued = resources
        .identifier_service
        .issue_csrf_token(CLIENT)
        .await
        .unwrap();
    let err = resources
        .identifier_service
        .issue_csrf_token(CLIENT)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RateLimited);

    // validation still has its own budget: the previously issued token
    // validates fine
    let headers = common::mutating_headers(&issued.token, &issued.token, Some(common::ALLOWED_ORIGIN));
    assert!(resources
        .csrf_guard
        .validate_request(&axum::http::Method::POST, &headers, CLIENT)
        .await
        .is_ok());
}

#[tokio::test]
async fn batch_issuance_charges_the_budget_once() {
    let mut config = test_config();
    config.rate_limits.issuance_max = 2;
    let resources = resources(config);

    // one batch of 50 is a single charge
    assert!(resources
        .identifier_service
        .issue_uuid_batch(50, CLIENT)
        .await
        .is_ok());
    assert!(resources.identifier_service.issue_uuid(CLIENT).await.is_ok());
    assert!(resources
        .identifier_service
        .issue_uuid(CLIENT)
        .await
        .is_err());
}
