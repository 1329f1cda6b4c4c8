// ABOUTME: Integration tests for the CSRF guard state machine end-to-end
// ABOUTME: Covers double-submit validation, one-time consumption, replay, and safe-method bypass
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::http::{HeaderMap, Method};
use common::{mutating_headers, resources, test_config, ALLOWED_ORIGIN, CLIENT};
use forgeguard::errors::ErrorCode;

#[tokio::test]
async fn valid_double_submit_with_good_origin_passes() {
    let resources = resources(test_config());
    let issued = resources
        .identifier_service
        .issue_csrf_token(CLIENT)
        .await
        .unwrap();

    let headers = mutating_headers(&issued.token, &issued.token, Some(ALLOWED_ORIGIN));
    let result = resources
        .csrf_guard
        .validate_request(&Method::POST, &headers, CLIENT)
        .await;

    assert!(result.is_ok(), "expected pass, got {result:?}");
}

#[tokio::test]
async fn replaying_a_consumed_token_fails_with_already_used() {
    let resources = resources(test_config());
    let issued = resources
        .identifier_service
        .issue_csrf_token(CLIENT)
        .await
        .unwrap();
    let headers = mutating_headers(&issued.token, &issued.token, Some(ALLOWED_ORIGIN));

    resources
        .csrf_guard
        .validate_request(&Method::POST, &headers, CLIENT)
        .await
        .unwrap();

    let replay = resources
        .csrf_guard
        .validate_request(&Method::POST, &headers, CLIENT)
        .await
        .unwrap_err();
    assert_eq!(replay.code, ErrorCode::TokenAlreadyUsed);
}

#[tokio::test]
async fn mismatched_pair_fails_without_consulting_the_store() {
    let resources = resources(test_config());
    let issued = resources
        .identifier_service
        .issue_csrf_token(CLIENT)
        .await
        .unwrap();

    let headers = mutating_headers(&issued.token, "some-other-token", Some(ALLOWED_ORIGIN));
    let err = resources
        .csrf_guard
        .validate_request(&Method::POST, &headers, CLIENT)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TokenMismatch);

    // The token survived the mismatch untouched: a matching pair still
    // validates, proving the store was never consulted
    let headers = mutating_headers(&issued.token, &issued.token, Some(ALLOWED_ORIGIN));
    assert!(resources
        .csrf_guard
        .validate_request(&Method::POST, &headers, CLIENT)
        .await
        .is_ok());
}

#[tokio::test]
async fn safe_methods_bypass_all_checks() {
    let resources = resources(test_config());

    // no cookie, no header, no origin: GET/HEAD/OPTIONS still pass
    for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
        assert!(resources
            .csrf_guard
            .validate_request(&method, &HeaderMap::new(), CLIENT)
            .await
            .is_ok());
    }
}

#[tokio::test]
async fn missing_cookie_or_header_token_is_rejected() {
    let resources = resources(test_config());
    let issued = resources
        .identifier_service
        .issue_csrf_token(CLIENT)
        .await
        .unwrap();

    // header token only, no cookie
    let mut headers = HeaderMap::new();
    headers.insert("x-csrf-token", issued.token.parse().unwrap());
    let err = resources
        .csrf_guard
        .validate_request(&Method::POST, &headers, CLIENT)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TokenMissing);

    // cookie only, no header token
    let mut headers = HeaderMap::new();
    headers.insert(
        "cookie",
        format!("__Host-csrf-token={}", issued.token).parse().unwrap(),
    );
    let err = resources
        .csrf_guard
        .validate_request(&Method::DELETE, &headers, CLIENT)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TokenMissing);
}

#[tokio::test]
async fn unknown_token_pair_is_invalid() {
    let resources = resources(test_config());
    let headers = mutating_headers("forged-token", "forged-token", Some(ALLOWED_ORIGIN));

    let err = resources
        .csrf_guard
        .validate_request(&Method::POST, &headers, CLIENT)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TokenInvalid);
}

#[tokio::test]
async fn valid_token_with_disallowed_origin_is_rejected() {
    let resources = resources(test_config());
    let issued = resources
        .identifier_service
        .issue_csrf_token(CLIENT)
        .await
        .unwrap();

    let headers = mutating_headers(
        &issued.token,
        &issued.token,
        Some("https://evil.example"),
    );
    let err = resources
        .csrf_guard
        .validate_request(&Method::POST, &headers, CLIENT)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::OriginRejected);
}

#[tokio::test]
async fn validation_budget_exhaustion_yields_rate_limited() {
    let mut config = test_config();
    config.rate_limits.validation_max = 2;
    let resources = resources(config);

    let headers = mutating_headers("t", "t", Some(ALLOWED_ORIGIN));
    for _ in 0..2 {
        // budget consumed even though the token is bogus
        let _ = resources
            .csrf_guard
            .validate_request(&Method::POST, &headers, CLIENT)
            .await;
    }

    let err = resources
        .csrf_guard
        .validate_request(&Method::POST, &headers, CLIENT)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RateLimited);

    // issuance budget is independent of the exhausted validation budget
    assert!(resources
        .identifier_service
        .issue_csrf_token(CLIENT)
        .await
        .is_ok());
}
