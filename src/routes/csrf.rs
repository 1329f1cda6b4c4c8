// ABOUTME: CSRF token issuance endpoint returning the token body and Set-Cookie directive
// ABOUTME: POST /csrf/token with per-client rate limiting; non-POST methods get 405
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! CSRF token issuance routes

use crate::errors::AppError;
use crate::middleware::extract_client_ip;
use crate::server::ServerResources;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::post, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

/// Response body for a freshly issued CSRF token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    /// The raw token; the client echoes it in the CSRF header
    pub csrf_token: String,
    /// Name of the header the token must be echoed in
    pub header_name: String,
    /// Token expiry as epoch milliseconds
    pub expires: i64,
}

/// CSRF issuance routes implementation
pub struct CsrfRoutes;

impl CsrfRoutes {
    /// Create the CSRF token issuance routes
    #[must_use]
    pub fn router() -> Router<Arc<ServerResources>> {
        Router::new().route("/csrf/token", post(issue_token))
    }
}

/// Handle `POST /csrf/token`
async fn issue_token(
    State(resources): State<Arc<ServerResources>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let client = extract_client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    let issued = resources.identifier_service.issue_csrf_token(&client).await?;

    let set_cookie = HeaderValue::from_str(&issued.set_cookie)
        .map_err(|e| AppError::internal("cookie directive not header-safe").with_source(e))?;

    let body = CsrfTokenResponse {
        csrf_token: issued.token,
        header_name: issued.header_name,
        expires: issued.expires_at_ms,
    };

    let mut response = (StatusCode::OK, Json(body)).into_response();
    response.headers_mut().insert(header::SET_COOKIE, set_cookie);
    Ok(response)
}
