// ABOUTME: Bearer-authenticated UUID issuance endpoints, single and batch
// ABOUTME: POST /uuid/generate and /uuid/generate/batch with per-client rate limiting
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! UUID issuance routes
//!
//! Both endpoints require `Authorization: Bearer <token>`. Internal errors
//! are returned with a generic message in production and a detailed one
//! otherwise.

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::middleware::extract_client_ip;
use crate::security::events::{self, SecurityEventKind};
use crate::server::ServerResources;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Response body for a single issued UUID
#[derive(Debug, Serialize)]
pub struct UuidResponse {
    /// The issued identifier
    pub uuid: String,
    /// Issuance time, RFC 3339
    pub timestamp: String,
}

/// Request body for batch issuance
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// Number of UUIDs to issue, 1..=100
    pub count: usize,
}

/// Response body for batch issuance
#[derive(Debug, Serialize)]
pub struct BatchUuidResponse {
    /// The issued identifiers
    pub uuids: Vec<String>,
    /// Issuance time, RFC 3339
    pub timestamp: String,
}

/// UUID issuance routes implementation
pub struct UuidRoutes;

impl UuidRoutes {
    /// Create the UUID issuance routes
    #[must_use]
    pub fn router() -> Router<Arc<ServerResources>> {
        Router::new()
            .route("/uuid/generate", post(generate_uuid))
            .route("/uuid/generate/batch", post(generate_uuid_batch))
    }
}

/// Handle `POST /uuid/generate`
async fn generate_uuid(
    State(resources): State<Arc<ServerResources>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Json<UuidResponse>, AppError> {
    let client = extract_client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    authenticate(&resources, &headers, &client)?;

    let uuid = resources
        .identifier_service
        .issue_uuid(&client)
        .await
        .map_err(|e| sanitize_internal(e, &resources))?;

    Ok(Json(UuidResponse {
        uuid,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Handle `POST /uuid/generate/batch`
async fn generate_uuid_batch(
    State(resources): State<Arc<ServerResources>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchUuidResponse>, AppError> {
    let client = extract_client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    authenticate(&resources, &headers, &client)?;

    let uuids = resources
        .identifier_service
        .issue_uuid_batch(request.count, &client)
        .await
        .map_err(|e| sanitize_internal(e, &resources))?;

    Ok(Json(BatchUuidResponse {
        uuids,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Validate the `Authorization: Bearer` header against the configured token
fn authenticate(resources: &ServerResources, headers: &HeaderMap, client: &str) -> AppResult<()> {
    let Some(expected) = &resources.config.uuid_api_token else {
        // No token configured: endpoint is open (development convenience)
        return Ok(());
    };

    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            events::record(SecurityEventKind::AuthFailed, client, "missing authorization header");
            AppError::auth_required()
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        events::record(
            SecurityEventKind::AuthFailed,
            client,
            "authorization header is not a bearer token",
        );
        AppError::auth_invalid("Authorization header must be 'Bearer <token>'")
    })?;

    if !bool::from(token.trim().as_bytes().ct_eq(expected.as_bytes())) {
        events::record(SecurityEventKind::AuthFailed, client, "bearer token rejected");
        return Err(AppError::auth_invalid("Invalid bearer token"));
    }

    Ok(())
}

/// Keep internal error bodies generic in production, detailed otherwise
fn sanitize_internal(err: AppError, resources: &ServerResources) -> AppError {
    let is_internal = matches!(
        err.code,
        ErrorCode::RandomUnavailable | ErrorCode::InternalError | ErrorCode::UpstreamIssuance
    );
    if !is_internal {
        return err;
    }

    tracing::error!(code = ?err.code, detail = %err.message, "internal issuance error");
    if resources.config.is_production() {
        AppError::internal("Internal server error")
    } else {
        err.with_exposed_detail()
    }
}
