// ABOUTME: CORS middleware applying per-route-profile decisions to every response
// ABOUTME: Short-circuits preflights, rejects disallowed methods, sets Access-Control headers
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CORS layer
//!
//! Thin axum layer over [`OriginPolicy::validate_cors`]: `OPTIONS`
//! preflights short-circuit with 204 and no body, methods outside the
//! route profile get 405, and allowed requests proceed with the computed
//! `Access-Control-Allow-*` headers stamped on the response.
//!
//! [`OriginPolicy::validate_cors`]: crate::security::origin::OriginPolicy::validate_cors

use crate::errors::AppError;
use crate::middleware::extract_client_ip;
use crate::security::events::{self, SecurityEventKind};
use crate::security::origin::{CorsDecision, CorsHeaders};
use crate::server::ServerResources;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;

/// Axum layer computing and applying the CORS decision for each request
pub async fn cors_middleware(
    State(resources): State<Arc<ServerResources>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let origin = request
        .headers()
        .get("origin")
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = extract_client_ip(request.headers(), remote);

    let decision =
        resources
            .origin_policy
            .validate_cors(&method, origin.as_deref(), &path, &client);

    match decision {
        CorsDecision::Preflight(headers) => {
            let mut response = StatusCode::NO_CONTENT.into_response();
            apply_cors_headers(response.headers_mut(), &headers);
            response
        }
        CorsDecision::MethodRejected => {
            events::record(
                SecurityEventKind::MethodNotAllowed,
                &client,
                &format!("{method} not allowed for {path}"),
            );
            AppError::method_not_allowed(format!("{method} not allowed for this route"))
                .into_response()
        }
        CorsDecision::Allowed(headers) => {
            let mut response = next.run(request).await;
            apply_cors_headers(response.headers_mut(), &headers);
            response
        }
    }
}

fn apply_cors_headers(map: &mut HeaderMap, headers: &CorsHeaders) {
    if let Some(allow_origin) = &headers.allow_origin {
        insert(map, "access-control-allow-origin", allow_origin);
        if headers.vary_origin {
            insert(map, "vary", "Origin");
        }
    }
    insert(map, "access-control-allow-methods", &headers.allow_methods);
    insert(map, "access-control-allow-headers", &headers.allow_headers);
    if headers.allow_credentials {
        insert(map, "access-control-allow-credentials", "true");
    }
    insert(
        map,
        "access-control-max-age",
        &headers.max_age_secs.to_string(),
    );
}

fn insert(map: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        map.insert(HeaderName::from_static(name), value);
    }
}
