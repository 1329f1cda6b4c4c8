// ABOUTME: Integration tests for origin provenance and route-profile CORS decisions
// ABOUTME: Verifies mutation provenance overrides token validity and profile precedence holds
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::http::Method;
use common::{mutating_headers, production_config, resources, test_config, ALLOWED_ORIGIN, CLIENT};
use forgeguard::errors::ErrorCode;
use forgeguard::security::origin::{CorsDecision, RouteProfileKind};
use forgeguard::security::OriginPolicy;

#[tokio::test]
async fn payment_route_put_without_origin_is_rejected_despite_valid_token() {
    let resources = resources(production_config());
    let issued = resources
        .identifier_service
        .issue_csrf_token(CLIENT)
        .await
        .unwrap();

    // valid double-submit pair, no Origin header at all
    let headers = mutating_headers(&issued.token, &issued.token, None);
    let err = resources
        .csrf_guard
        .validate_request(&Method::PUT, &headers, CLIENT)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::OriginRejected);
}

#[tokio::test]
async fn referer_outside_allow_list_rejects_even_with_good_origin() {
    let resources = resources(production_config());
    let issued = resources
        .identifier_service
        .issue_csrf_token(CLIENT)
        .await
        .unwrap();

    let mut headers = mutating_headers(&issued.token, &issued.token, Some(ALLOWED_ORIGIN));
    headers.insert("referer", "https://evil.example/launder".parse().unwrap());

    let err = resources
        .csrf_guard
        .validate_request(&Method::POST, &headers, CLIENT)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::OriginRejected);
}

#[test]
fn financial_routes_resolve_ahead_of_other_profiles() {
    for path in ["/account/close", "/transaction/submit", "/api/payment/run"] {
        assert_eq!(
            OriginPolicy::resolve_profile(path).kind,
            RouteProfileKind::Financial,
            "path {path} should be financial"
        );
    }
    assert_eq!(
        OriginPolicy::resolve_profile("/auth/session").kind,
        RouteProfileKind::Auth
    );
}

#[test]
fn preflight_short_circuits_on_every_profile() {
    let config = test_config();
    let policy = OriginPolicy::new(config.environment, &config.cors);

    for path in ["/public/rates", "/auth/session", "/payment/run", "/other"] {
        let decision =
            policy.validate_cors(&Method::OPTIONS, Some(ALLOWED_ORIGIN), path, CLIENT);
        assert!(
            matches!(decision, CorsDecision::Preflight(_)),
            "OPTIONS on {path} must preflight"
        );
    }
}

#[test]
fn public_profile_rejects_mutating_methods() {
    let config = test_config();
    let policy = OriginPolicy::new(config.environment, &config.cors);

    let decision = policy.validate_cors(&Method::POST, Some(ALLOWED_ORIGIN), "/public/rates", CLIENT);
    assert!(matches!(decision, CorsDecision::MethodRejected));
}
